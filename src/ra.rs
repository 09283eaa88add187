//! `ra` defines the relational algebra (RA) tree that queries are planned
//! into. A query is a tree of operator nodes; children produce rows and
//! parents consume them. Leaves are base relations and aliased subqueries.

use crate::ast;

#[derive(Debug, Clone, PartialEq)]
pub enum RaNode {
    Project(Project),
    Select(Select),
    Join(Join),
    Rename(Rename),
    Subquery(Subquery),
    Base(Base),
}

/// Keeps only the named columns of its input, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub columns: Vec<ast::ColumnRef>,
    pub input: Box<RaNode>,
}

/// Keeps only the input rows satisfying a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub condition: ast::Predicate,
    pub input: Box<RaNode>,
}

/// Combines two inputs, pairwise. With no condition this is a cross
/// product; with one, only pairs satisfying it are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub condition: Option<ast::Predicate>,
    pub left: Box<RaNode>,
    pub right: Box<RaNode>,
}

/// Makes the input relation addressable under a different name.
#[derive(Debug, Clone, PartialEq)]
pub struct Rename {
    pub old_name: String,
    pub new_name: String,
    pub input: Box<RaNode>,
}

/// A nested query whose result is addressable by its alias. The interior
/// tree has its own name scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub alias: String,
    pub input: Box<RaNode>,
}

/// A scan of stored relations. Planned queries put one relation per leaf,
/// but the node carries a list so hand-built trees can fold a cross
/// product into a single scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub relations: Vec<ast::Relation>,
}

impl RaNode {
    pub fn base(relation: ast::Relation) -> RaNode {
        RaNode::Base(Base {
            relations: vec![relation],
        })
    }
    pub fn select(condition: ast::Predicate, input: RaNode) -> RaNode {
        RaNode::Select(Select {
            condition,
            input: Box::new(input),
        })
    }
    pub fn join(condition: Option<ast::Predicate>, left: RaNode, right: RaNode) -> RaNode {
        RaNode::Join(Join {
            condition,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
    pub fn project(columns: Vec<ast::ColumnRef>, input: RaNode) -> RaNode {
        RaNode::Project(Project {
            columns,
            input: Box::new(input),
        })
    }
    pub fn rename(old_name: &str, new_name: &str, input: RaNode) -> RaNode {
        RaNode::Rename(Rename {
            old_name: String::from(old_name),
            new_name: String::from(new_name),
            input: Box::new(input),
        })
    }
    pub fn subquery(alias: &str, input: RaNode) -> RaNode {
        RaNode::Subquery(Subquery {
            alias: String::from(alias),
            input: Box::new(input),
        })
    }
}
