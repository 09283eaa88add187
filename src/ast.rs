//! This module defines abstract syntax tree (AST) types for SQL.

use enum_as_inner::EnumAsInner;

/// A column reference, optionally qualified with a relation name or alias,
/// as in `o.total` or `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn unqualified(name: &str) -> ColumnRef {
        ColumnRef {
            qualifier: None,
            name: String::from(name),
        }
    }
    pub fn qualified(qualifier: &str, name: &str) -> ColumnRef {
        ColumnRef {
            qualifier: Some(String::from(qualifier)),
            name: String::from(name),
        }
    }
    /// Splits a dotted name at its first dot, so `o.total` qualifies `total`
    /// with `o`, and `o.a.b` qualifies `a.b` with `o`.
    pub fn from_dotted(s: &str) -> ColumnRef {
        match s.split_once('.') {
            Some((qualifier, name)) => ColumnRef::qualified(qualifier, name),
            None => ColumnRef::unqualified(s),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => self.name.fmt(f),
        }
    }
}

/// A relation named in a FROM clause, as in `orders` or `orders o`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub alias: Option<String>,
}

impl Relation {
    pub fn named(name: &str) -> Relation {
        Relation {
            name: String::from(name),
            alias: None,
        }
    }
    pub fn aliased(name: &str, alias: &str) -> Relation {
        Relation {
            name: String::from(name),
            alias: Some(String::from(alias)),
        }
    }
    /// True if a column qualifier addresses this relation by alias or name.
    pub fn answers_to(&self, qualifier: &str) -> bool {
        self.alias.as_deref() == Some(qualifier) || self.name == qualifier
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(a) => write!(f, "{} {}", self.name, a),
            None => self.name.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(x) => x.fmt(f),
            Literal::Float(x) => x.fmt(f),
            Literal::Str(x) => write!(f, "'{}'", x),
        }
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Literal),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Column(x) => x.fmt(f),
            Operand::Literal(x) => x.fmt(f),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CompareOp::*;
        match self {
            Eq => "=".fmt(f),
            Ne => "<>".fmt(f),
            Lt => "<".fmt(f),
            Le => "<=".fmt(f),
            Gt => ">".fmt(f),
            Ge => ">=".fmt(f),
        }
    }
}

/// A boolean predicate over comparisons, as found in WHERE and ON clauses.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Predicate {
    Comparison {
        op: CompareOp,
        left: ColumnRef,
        right: Operand,
    },
    And {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Or {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Not {
        operand: Box<Predicate>,
    },
}

impl Predicate {
    pub fn comparison(op: CompareOp, left: ColumnRef, right: Operand) -> Predicate {
        Predicate::Comparison { op, left, right }
    }
    pub fn and(left: Predicate, right: Predicate) -> Predicate {
        Predicate::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn or(left: Predicate, right: Predicate) -> Predicate {
        Predicate::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn not(operand: Predicate) -> Predicate {
        Predicate::Not {
            operand: Box::new(operand),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Comparison { op, left, right } => {
                write!(f, "{} {} {}", left, op, right)
            }
            Predicate::And { left, right } => write!(f, "({} AND {})", left, right),
            Predicate::Or { left, right } => write!(f, "({} OR {})", left, right),
            Predicate::Not { operand } => write!(f, "(NOT {})", operand),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub items: Vec<SelItem>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum SelItem {
    Column(ColumnRef),
    Star,
}

impl std::fmt::Display for SelItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelItem::Column(x) => x.fmt(f),
            SelItem::Star => "*".fmt(f),
        }
    }
}

/// One source of rows in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table(Relation),
    Subquery {
        query: Box<SelectStatement>,
        alias: Option<String>,
    },
}

/// A FROM clause element together with the ON condition that joins it to the
/// elements before it. The first element and comma-separated elements carry
/// no condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub source: Source,
    pub condition: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub items: Vec<FromItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub select: SelectClause,
    pub from: FromClause,
    pub where_clause: Option<Predicate>,
    // pub group_by: Option<GroupByClause>,
    // pub order_by: Option<OrderByClause>,
    // pub limit: Option<LimitClause>,
}
