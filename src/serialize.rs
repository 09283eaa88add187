//! `serialize` renders RA trees as JSON documents. Every node is an object
//! keyed by "type"; children keep their order (a join's left before right,
//! project columns as listed). Optional pieces (a cross join's missing
//! condition, a relation with no alias) omit their key instead of writing
//! null.

use serde_json::json;
use serde_json::Value;

use crate::ast;
use crate::ra::RaNode;

pub fn ra_tree_to_json(node: &RaNode) -> Value {
    match node {
        RaNode::Project(p) => json!({
            "type": "project",
            "columns": p.columns.iter().map(column_to_json).collect::<Vec<Value>>(),
            "input": ra_tree_to_json(&p.input),
        }),
        RaNode::Select(sel) => json!({
            "type": "select",
            "condition": predicate_to_json(&sel.condition),
            "input": ra_tree_to_json(&sel.input),
        }),
        RaNode::Join(join) => {
            let mut obj = json!({
                "type": "join",
                "left": ra_tree_to_json(&join.left),
                "right": ra_tree_to_json(&join.right),
            });
            if let Some(condition) = &join.condition {
                obj.as_object_mut()
                    .unwrap()
                    .insert(String::from("condition"), predicate_to_json(condition));
            }
            obj
        }
        RaNode::Rename(rn) => json!({
            "type": "rename",
            "old_name": rn.old_name,
            "new_name": rn.new_name,
            "input": ra_tree_to_json(&rn.input),
        }),
        RaNode::Subquery(sq) => json!({
            "type": "subquery",
            "alias": sq.alias,
            "query": ra_tree_to_json(&sq.input),
        }),
        RaNode::Base(base) => json!({
            "type": "base_relation",
            "tables": base.relations.iter().map(relation_to_json).collect::<Vec<Value>>(),
        }),
    }
}

pub fn predicate_to_json(p: &ast::Predicate) -> Value {
    match p {
        ast::Predicate::Comparison { op, left, right } => json!({
            "type": compare_op_name(op),
            "left": column_to_json(left),
            "right": operand_to_json(right),
        }),
        ast::Predicate::And { left, right } => json!({
            "type": "AND",
            "left": predicate_to_json(left),
            "right": predicate_to_json(right),
        }),
        ast::Predicate::Or { left, right } => json!({
            "type": "OR",
            "left": predicate_to_json(left),
            "right": predicate_to_json(right),
        }),
        ast::Predicate::Not { operand } => json!({
            "type": "NOT",
            "cond": predicate_to_json(operand),
        }),
    }
}

fn compare_op_name(op: &ast::CompareOp) -> &'static str {
    use ast::CompareOp::*;
    match op {
        Eq => "EQ",
        Ne => "NE",
        Lt => "LT",
        Le => "LE",
        Gt => "GT",
        Ge => "GE",
    }
}

/// A column on the left of a comparison or in a project list is a bare
/// {table, attr} object; the right-hand operand form is tagged instead.
fn column_to_json(column: &ast::ColumnRef) -> Value {
    match &column.qualifier {
        Some(table) => json!({ "table": table, "attr": column.name }),
        None => json!({ "attr": column.name }),
    }
}

fn operand_to_json(operand: &ast::Operand) -> Value {
    match operand {
        ast::Operand::Column(c) => match &c.qualifier {
            Some(table) => json!({ "type": "column", "table": table, "attr": c.name }),
            None => json!({ "type": "column", "attr": c.name }),
        },
        ast::Operand::Literal(ast::Literal::Int(i)) => json!({ "type": "int", "value": i }),
        ast::Operand::Literal(ast::Literal::Float(x)) => json!({ "type": "float", "value": x }),
        ast::Operand::Literal(ast::Literal::Str(s)) => json!({ "type": "string", "value": s }),
    }
}

fn relation_to_json(relation: &ast::Relation) -> Value {
    match &relation.alias {
        Some(alias) => json!({ "name": relation.name, "alias": alias }),
        None => json!({ "name": relation.name }),
    }
}

/// Pretty-printed form for the command line.
pub fn ra_tree_to_string(node: &RaNode) -> String {
    serde_json::to_string_pretty(&ra_tree_to_json(node)).unwrap()
}

#[cfg(test)]
use crate::ast::{ColumnRef, Relation};
#[cfg(test)]
use crate::predicate::predicate_from_str;

#[test]
fn test_serialize_base_relation() {
    let node = RaNode::base(Relation::aliased("orders", "o"));
    assert_eq!(
        ra_tree_to_json(&node),
        json!({ "type": "base_relation", "tables": [{ "name": "orders", "alias": "o" }] })
    );

    let node = RaNode::base(Relation::named("orders"));
    assert_eq!(
        ra_tree_to_json(&node),
        json!({ "type": "base_relation", "tables": [{ "name": "orders" }] })
    );
}

#[test]
fn test_serialize_conditions() {
    let cases = vec![
        (
            "c.age > 30",
            json!({
                "type": "GT",
                "left": { "table": "c", "attr": "age" },
                "right": { "type": "int", "value": 30 },
            }),
        ),
        (
            "c.city = 'New York'",
            json!({
                "type": "EQ",
                "left": { "table": "c", "attr": "city" },
                "right": { "type": "string", "value": "New York" },
            }),
        ),
        (
            "c.score <= 1.5",
            json!({
                "type": "LE",
                "left": { "table": "c", "attr": "score" },
                "right": { "type": "float", "value": 1.5 },
            }),
        ),
        (
            "c.id <> o.cid",
            json!({
                "type": "NE",
                "left": { "table": "c", "attr": "id" },
                "right": { "type": "column", "table": "o", "attr": "cid" },
            }),
        ),
        (
            "x = 1",
            json!({
                "type": "EQ",
                "left": { "attr": "x" },
                "right": { "type": "int", "value": 1 },
            }),
        ),
        (
            "a.x = 1 AND NOT (b.y = 2 OR b.z = 3)",
            json!({
                "type": "AND",
                "left": {
                    "type": "EQ",
                    "left": { "table": "a", "attr": "x" },
                    "right": { "type": "int", "value": 1 },
                },
                "right": {
                    "type": "NOT",
                    "cond": {
                        "type": "OR",
                        "left": {
                            "type": "EQ",
                            "left": { "table": "b", "attr": "y" },
                            "right": { "type": "int", "value": 2 },
                        },
                        "right": {
                            "type": "EQ",
                            "left": { "table": "b", "attr": "z" },
                            "right": { "type": "int", "value": 3 },
                        },
                    },
                },
            }),
        ),
    ];
    for case in cases {
        assert_eq!(
            predicate_to_json(&predicate_from_str(case.0)),
            case.1,
            "serializing {}",
            case.0
        );
    }
}

#[test]
fn test_join_without_condition_omits_the_key() {
    let node = RaNode::join(
        None,
        RaNode::base(Relation::named("a")),
        RaNode::base(Relation::named("b")),
    );
    let value = ra_tree_to_json(&node);
    assert!(value.get("condition").is_none());
    assert_eq!(value.get("type").unwrap(), "join");
}

#[test]
fn test_serialize_full_tree() {
    let tree = RaNode::project(
        vec![ColumnRef::qualified("a", "x")],
        RaNode::join(
            Some(predicate_from_str("a.x = b.x")),
            RaNode::select(predicate_from_str("a.y = 1"), RaNode::base(Relation::named("a"))),
            RaNode::select(
                predicate_from_str("b.z = 2"),
                RaNode::base(Relation::aliased("bravo", "b")),
            ),
        ),
    );
    let expected = json!({
        "type": "project",
        "columns": [{ "table": "a", "attr": "x" }],
        "input": {
            "type": "join",
            "condition": {
                "type": "EQ",
                "left": { "table": "a", "attr": "x" },
                "right": { "type": "column", "table": "b", "attr": "x" },
            },
            "left": {
                "type": "select",
                "condition": {
                    "type": "EQ",
                    "left": { "table": "a", "attr": "y" },
                    "right": { "type": "int", "value": 1 },
                },
                "input": { "type": "base_relation", "tables": [{ "name": "a" }] },
            },
            "right": {
                "type": "select",
                "condition": {
                    "type": "EQ",
                    "left": { "table": "b", "attr": "z" },
                    "right": { "type": "int", "value": 2 },
                },
                "input": { "type": "base_relation", "tables": [{ "name": "bravo", "alias": "b" }] },
            },
        },
    });
    assert_eq!(ra_tree_to_json(&tree), expected);
}

#[test]
fn test_serialize_rename_and_subquery() {
    let tree = RaNode::rename(
        "t",
        "r",
        RaNode::subquery(
            "s",
            RaNode::base(Relation::named("t")),
        ),
    );
    let expected = json!({
        "type": "rename",
        "old_name": "t",
        "new_name": "r",
        "input": {
            "type": "subquery",
            "alias": "s",
            "query": { "type": "base_relation", "tables": [{ "name": "t" }] },
        },
    });
    assert_eq!(ra_tree_to_json(&tree), expected);
}
