//! `resolve` maps column qualifiers to the relations visible at a point in
//! an RA tree. Base leaves contribute their relations, a subquery
//! contributes only its alias, and a rename swaps one visible name for
//! another. Select, Project and Join pass visibility through.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::ast;
use crate::ra::RaNode;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Column reference {0} does not match any relation in scope.")]
    UnresolvedAttribute(String),
    #[error("Column reference {0} matches more than one relation in scope.")]
    AmbiguousAttribute(String),
}

/// The set of relations a column qualifier can address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    relations: Vec<ast::Relation>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope { relations: vec![] }
    }

    pub fn from_relations(relations: Vec<ast::Relation>) -> Scope {
        Scope { relations }
    }

    /// The relations visible to an operator sitting directly above `node`.
    pub fn of(node: &RaNode) -> Scope {
        match node {
            RaNode::Base(base) => Scope {
                relations: base.relations.clone(),
            },
            RaNode::Subquery(sq) => Scope {
                relations: vec![ast::Relation::named(&sq.alias)],
            },
            RaNode::Rename(rn) => {
                let mut scope = Scope::of(&rn.input);
                for r in scope.relations.iter_mut() {
                    if r.answers_to(&rn.old_name) {
                        *r = ast::Relation::named(&rn.new_name);
                    }
                }
                scope
            }
            RaNode::Select(sel) => Scope::of(&sel.input),
            RaNode::Project(p) => Scope::of(&p.input),
            RaNode::Join(join) => {
                let mut scope = Scope::of(&join.left);
                scope.relations.extend(Scope::of(&join.right).relations);
                scope
            }
        }
    }

    pub fn push(&mut self, relation: ast::Relation) {
        self.relations.push(relation);
    }

    /// True if some visible relation answers to the qualifier.
    pub fn contains(&self, qualifier: &str) -> bool {
        self.relations.iter().any(|r| r.answers_to(qualifier))
    }

    /// True if every qualifier in the footprint addresses some visible
    /// relation.
    pub fn covers(&self, footprint: &BTreeSet<String>) -> bool {
        footprint.iter().all(|q| self.contains(q))
    }
}

/// Finds the visible relation a column reference addresses. An alias match
/// is preferred over a raw table-name match, so in `FROM orders o` both
/// `o.total` and `orders.total` resolve while a second relation named `o`
/// would make only the former ambiguous.
///
/// No per-relation schema is tracked, so an unqualified column cannot be
/// checked against attribute lists. It pins down its relation only when a
/// single relation is visible; otherwise it is accepted as `Ok(None)` and
/// taken to be satisfiable by any visible relation.
pub fn resolve<'a>(
    column: &ast::ColumnRef,
    scope: &'a Scope,
) -> Result<Option<&'a ast::Relation>, Error> {
    let qualifier = match &column.qualifier {
        Some(q) => q,
        None => {
            return match scope.relations.len() {
                1 => Ok(Some(&scope.relations[0])),
                _ => Ok(None),
            };
        }
    };

    let alias_hits: Vec<&ast::Relation> = scope
        .relations
        .iter()
        .filter(|r| r.alias.as_deref() == Some(qualifier.as_str()))
        .collect();
    match alias_hits.len() {
        1 => return Ok(Some(alias_hits[0])),
        0 => (),
        _ => return Err(Error::AmbiguousAttribute(column.to_string())),
    }

    let name_hits: Vec<&ast::Relation> = scope
        .relations
        .iter()
        .filter(|r| r.name == *qualifier)
        .collect();
    match name_hits.len() {
        0 => Err(Error::UnresolvedAttribute(column.to_string())),
        1 => Ok(Some(name_hits[0])),
        _ => Err(Error::AmbiguousAttribute(column.to_string())),
    }
}

#[cfg(test)]
use crate::ast::{ColumnRef, Relation};

#[test]
fn test_resolve_by_alias_and_name() {
    let scope = Scope::from_relations(vec![
        Relation::aliased("customers", "c"),
        Relation::named("orders"),
    ]);
    assert_eq!(
        resolve(&ColumnRef::qualified("c", "id"), &scope),
        Ok(Some(&Relation::aliased("customers", "c")))
    );
    assert_eq!(
        resolve(&ColumnRef::qualified("customers", "id"), &scope),
        Ok(Some(&Relation::aliased("customers", "c")))
    );
    assert_eq!(
        resolve(&ColumnRef::qualified("orders", "total"), &scope),
        Ok(Some(&Relation::named("orders")))
    );
}

#[test]
fn test_resolve_prefers_alias_over_name() {
    // An alias match wins even when another relation's raw name collides.
    let scope = Scope::from_relations(vec![
        Relation::aliased("customers", "orders"),
        Relation::named("orders"),
    ]);
    assert_eq!(
        resolve(&ColumnRef::qualified("orders", "id"), &scope),
        Ok(Some(&Relation::aliased("customers", "orders")))
    );
}

#[test]
fn test_resolve_unqualified() {
    let one = Scope::from_relations(vec![Relation::named("t")]);
    assert_eq!(
        resolve(&ColumnRef::unqualified("x"), &one),
        Ok(Some(&Relation::named("t")))
    );

    // With several relations visible and no schema catalog, an unqualified
    // column is accepted without being pinned to a relation.
    let two = Scope::from_relations(vec![Relation::named("t"), Relation::named("u")]);
    assert_eq!(resolve(&ColumnRef::unqualified("x"), &two), Ok(None));
}

#[test]
fn test_resolve_misses() {
    let scope = Scope::from_relations(vec![Relation::aliased("customers", "c")]);
    assert_eq!(
        resolve(&ColumnRef::qualified("x", "id"), &scope),
        Err(Error::UnresolvedAttribute(String::from("x.id")))
    );
    assert_eq!(
        resolve(&ColumnRef::qualified("orders", "id"), &scope),
        Err(Error::UnresolvedAttribute(String::from("orders.id")))
    );
}

#[test]
fn test_resolve_duplicate_names_ambiguous() {
    let scope = Scope::from_relations(vec![
        Relation::aliased("t", "a"),
        Relation::aliased("t", "b"),
    ]);
    assert_eq!(
        resolve(&ColumnRef::qualified("a", "x"), &scope),
        Ok(Some(&Relation::aliased("t", "a")))
    );
    assert_eq!(
        resolve(&ColumnRef::qualified("t", "x"), &scope),
        Err(Error::AmbiguousAttribute(String::from("t.x")))
    );
}

#[test]
fn test_scope_of_tree_nodes() {
    let base = RaNode::Base(crate::ra::Base {
        relations: vec![Relation::named("a"), Relation::named("b")],
    });
    assert_eq!(
        Scope::of(&base),
        Scope::from_relations(vec![Relation::named("a"), Relation::named("b")])
    );

    let sub = RaNode::subquery("s", RaNode::base(Relation::named("t")));
    assert_eq!(
        Scope::of(&sub),
        Scope::from_relations(vec![Relation::named("s")])
    );

    let joined = RaNode::join(
        None,
        RaNode::base(Relation::aliased("t", "x")),
        RaNode::base(Relation::named("u")),
    );
    assert_eq!(
        Scope::of(&joined),
        Scope::from_relations(vec![Relation::aliased("t", "x"), Relation::named("u")])
    );
}

#[test]
fn test_scope_of_rename() {
    let renamed = RaNode::rename("t", "r", RaNode::base(Relation::named("t")));
    assert_eq!(
        Scope::of(&renamed),
        Scope::from_relations(vec![Relation::named("r")])
    );
    // The old name is no longer visible above the rename.
    assert!(!Scope::of(&renamed).contains("t"));
}

#[test]
fn test_scope_covers() {
    let scope = Scope::from_relations(vec![
        Relation::aliased("customers", "c"),
        Relation::named("orders"),
    ]);
    let mut footprint = BTreeSet::new();
    footprint.insert(String::from("c"));
    footprint.insert(String::from("orders"));
    assert!(scope.covers(&footprint));
    footprint.insert(String::from("missing"));
    assert!(!scope.covers(&footprint));
}
