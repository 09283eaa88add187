//! `ast_to_ra` converts a select statement AST into a relational algebra
//! tree. FROM sources become leaves folded left-to-right into a left-deep
//! join chain, WHERE becomes one Select above the joins carrying the whole
//! predicate unsplit, and a non-star select list becomes the outermost
//! Project. The tree is deliberately naive; `optimize_ra` relocates the
//! filtering afterwards.
//!
//! Every column reference is resolved while building, so a returned tree
//! never mentions a relation that was not declared in a FROM clause.

use thiserror::Error;

use crate::ast;
use crate::predicate;
use crate::ra;
use crate::resolve;
use crate::resolve::Scope;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Subquery in a FROM clause must have an alias.")]
    MissingSubqueryAlias,
    #[error("Relation name or alias {0} appears more than once in a FROM clause.")]
    DuplicateRelation(String),
    #[error("Join condition references {0}, which is not declared in the FROM clause.")]
    UndeclaredRelation(String),
    #[error("FROM clause has no sources.")]
    EmptyFrom,
    #[error(transparent)]
    Resolve(#[from] resolve::Error),
}

pub fn ast_select_statement_to_ra(ss: &ast::SelectStatement) -> Result<ra::RaNode, Error> {
    let scope = from_scope(&ss.from)?;

    let mut items = ss.from.items.iter();
    let first = match items.next() {
        Some(first) => first,
        None => return Err(Error::EmptyFrom),
    };
    let mut node = source_to_ra(&first.source)?;
    if let Some(condition) = &first.condition {
        // The grammar never attaches a condition to the first source, but a
        // hand-built AST may; honor it as a plain selection.
        check_join_condition(condition, &scope)?;
        node = ra::RaNode::select(condition.clone(), node);
    }
    for item in items {
        if let Some(condition) = &item.condition {
            check_join_condition(condition, &scope)?;
        }
        node = ra::RaNode::join(item.condition.clone(), node, source_to_ra(&item.source)?);
    }

    if let Some(where_clause) = &ss.where_clause {
        for column in predicate::columns(where_clause) {
            resolve::resolve(column, &scope)?;
        }
        node = ra::RaNode::select(where_clause.clone(), node);
    }

    let mut columns = vec![];
    for item in &ss.select.items {
        if let Some(column) = item.as_column() {
            resolve::resolve(column, &scope)?;
            columns.push(column.clone());
        }
    }
    if !columns.is_empty() {
        // A bare star is the identity projection and needs no node.
        node = ra::RaNode::project(columns, node);
    }
    Ok(node)
}

/// Collects the relation declared by each FROM source. A source is
/// addressed by its alias when it has one, else by its name; two sources
/// answering to the same handle are rejected here rather than surfacing
/// later as ambiguous references.
fn from_scope(from: &ast::FromClause) -> Result<Scope, Error> {
    let mut scope = Scope::new();
    for item in &from.items {
        let relation = match &item.source {
            ast::Source::Table(r) => r.clone(),
            ast::Source::Subquery { alias: Some(a), .. } => ast::Relation::named(a),
            ast::Source::Subquery { alias: None, .. } => return Err(Error::MissingSubqueryAlias),
        };
        let handle = relation
            .alias
            .clone()
            .unwrap_or_else(|| relation.name.clone());
        if scope.contains(&handle) {
            return Err(Error::DuplicateRelation(handle));
        }
        scope.push(relation);
    }
    Ok(scope)
}

fn source_to_ra(source: &ast::Source) -> Result<ra::RaNode, Error> {
    match source {
        ast::Source::Table(r) => Ok(ra::RaNode::base(r.clone())),
        ast::Source::Subquery { query, alias } => {
            let alias = alias.as_ref().ok_or(Error::MissingSubqueryAlias)?;
            // The interior is built with its own scope; only the alias is
            // visible from out here.
            Ok(ra::RaNode::subquery(alias, ast_select_statement_to_ra(query)?))
        }
    }
}

fn check_join_condition(condition: &ast::Predicate, scope: &Scope) -> Result<(), Error> {
    for column in predicate::columns(condition) {
        match resolve::resolve(column, scope) {
            Ok(_) => (),
            Err(resolve::Error::UnresolvedAttribute(_)) => {
                // An unresolved reference always carries a qualifier;
                // unqualified columns resolve optimistically.
                return Err(Error::UndeclaredRelation(
                    column.qualifier.clone().unwrap(),
                ));
            }
            Err(e) => return Err(Error::Resolve(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
fn build(query: &str) -> Result<ra::RaNode, Error> {
    let ss = crate::pt_to_ast::pt_select_statement_to_ast(query).unwrap();
    ast_select_statement_to_ra(&ss)
}

#[cfg(test)]
use crate::predicate::predicate_from_str;

#[test]
fn test_ast_select_statement_to_ra() {
    use crate::ast::{ColumnRef, Relation};
    use crate::ra::RaNode;

    struct Case {
        desc: String,
        input: &'static str,
        expected: RaNode,
    }
    let cases: Vec<Case> = vec![
        Case {
            desc: "bare scan".to_string(),
            input: "SELECT * FROM t",
            expected: RaNode::base(Relation::named("t")),
        },
        Case {
            desc: "projection".to_string(),
            input: "SELECT t.x, t.y FROM t",
            expected: RaNode::project(
                vec![
                    ColumnRef::qualified("t", "x"),
                    ColumnRef::qualified("t", "y"),
                ],
                RaNode::base(Relation::named("t")),
            ),
        },
        Case {
            desc: "cross product".to_string(),
            input: "SELECT * FROM a, b",
            expected: RaNode::join(
                None,
                RaNode::base(Relation::named("a")),
                RaNode::base(Relation::named("b")),
            ),
        },
        Case {
            desc: "join with condition".to_string(),
            input: "SELECT * FROM a JOIN b ON a.x = b.y",
            expected: RaNode::join(
                Some(predicate_from_str("a.x = b.y")),
                RaNode::base(Relation::named("a")),
                RaNode::base(Relation::named("b")),
            ),
        },
        Case {
            desc: "left-deep fold of three sources".to_string(),
            input: "SELECT * FROM a, b JOIN c ON a.x = c.x",
            expected: RaNode::join(
                Some(predicate_from_str("a.x = c.x")),
                RaNode::join(
                    None,
                    RaNode::base(Relation::named("a")),
                    RaNode::base(Relation::named("b")),
                ),
                RaNode::base(Relation::named("c")),
            ),
        },
        Case {
            desc: "where stays unsplit above the joins".to_string(),
            input: "SELECT a.x FROM a, b WHERE a.x = 1 AND b.y = 2",
            expected: RaNode::project(
                vec![ColumnRef::qualified("a", "x")],
                RaNode::select(
                    predicate_from_str("a.x = 1 AND b.y = 2"),
                    RaNode::join(
                        None,
                        RaNode::base(Relation::named("a")),
                        RaNode::base(Relation::named("b")),
                    ),
                ),
            ),
        },
        Case {
            desc: "aliased tables".to_string(),
            input: "SELECT o.total FROM orders o WHERE o.total > 100",
            expected: RaNode::project(
                vec![ColumnRef::qualified("o", "total")],
                RaNode::select(
                    predicate_from_str("o.total > 100"),
                    RaNode::base(Relation::aliased("orders", "o")),
                ),
            ),
        },
        Case {
            desc: "subquery leaf with its own interior tree".to_string(),
            input: "SELECT s.x FROM (SELECT x FROM t) s",
            expected: RaNode::project(
                vec![ColumnRef::qualified("s", "x")],
                RaNode::subquery(
                    "s",
                    RaNode::project(
                        vec![ColumnRef::unqualified("x")],
                        RaNode::base(Relation::named("t")),
                    ),
                ),
            ),
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let actual = build(case.input).unwrap();
        assert_eq!(actual, case.expected);
    }
}

#[test]
fn test_construction_errors() {
    assert!(matches!(
        build("SELECT * FROM (SELECT x FROM t)"),
        Err(Error::MissingSubqueryAlias)
    ));
    assert!(matches!(
        build("SELECT * FROM t, t"),
        Err(Error::DuplicateRelation(name)) if name == "t"
    ));
    assert!(matches!(
        build("SELECT * FROM a x, b x"),
        Err(Error::DuplicateRelation(name)) if name == "x"
    ));
    assert!(matches!(
        build("SELECT * FROM a JOIN b ON a.x = c.y"),
        Err(Error::UndeclaredRelation(name)) if name == "c"
    ));
    assert!(matches!(
        build("SELECT q.x FROM t"),
        Err(Error::Resolve(resolve::Error::UnresolvedAttribute(_)))
    ));
    assert!(matches!(
        build("SELECT * FROM t WHERE q.x = 1"),
        Err(Error::Resolve(resolve::Error::UnresolvedAttribute(_)))
    ));
}

#[test]
fn test_no_partial_tree_on_inner_subquery_error() {
    // The failure is inside the nested query; the whole build aborts.
    assert!(matches!(
        build("SELECT s.x FROM (SELECT x FROM (SELECT y FROM u)) s"),
        Err(Error::MissingSubqueryAlias)
    ));
}

#[test]
fn test_aliased_table_still_answers_to_its_name() {
    assert!(build("SELECT orders.total FROM orders o").is_ok());
    assert!(build("SELECT o.total FROM orders o").is_ok());
}
