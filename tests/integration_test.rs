use serde_json::json;

#[test]
fn test_plan_query_pushes_filters_to_their_relations() {
    // Two conjuncts each mention one relation, so each lands on its scan.
    // The equality spans both, so the cross product becomes a real join.
    let tree = sql2ra::plan_query(
        "SELECT c.name, o.total FROM customers c, orders o \
         WHERE c.id = o.cid AND c.age > 30 AND o.total > 100",
    )
    .unwrap();
    let expected = json!({
        "type": "project",
        "columns": [
            { "table": "c", "attr": "name" },
            { "table": "o", "attr": "total" },
        ],
        "input": {
            "type": "join",
            "condition": {
                "type": "EQ",
                "left": { "table": "c", "attr": "id" },
                "right": { "type": "column", "table": "o", "attr": "cid" },
            },
            "left": {
                "type": "select",
                "condition": {
                    "type": "GT",
                    "left": { "table": "c", "attr": "age" },
                    "right": { "type": "int", "value": 30 },
                },
                "input": {
                    "type": "base_relation",
                    "tables": [{ "name": "customers", "alias": "c" }],
                },
            },
            "right": {
                "type": "select",
                "condition": {
                    "type": "GT",
                    "left": { "table": "o", "attr": "total" },
                    "right": { "type": "int", "value": 100 },
                },
                "input": {
                    "type": "base_relation",
                    "tables": [{ "name": "orders", "alias": "o" }],
                },
            },
        },
    });
    assert_eq!(sql2ra::serialize::ra_tree_to_json(&tree), expected);
}

#[test]
fn test_plan_query_unoptimized_leaves_the_filter_on_top() {
    // Same statement as above, but the WHERE clause stays one unsplit
    // selection above a join with no condition.
    let tree = sql2ra::plan_query_unoptimized(
        "SELECT c.name, o.total FROM customers c, orders o \
         WHERE c.id = o.cid AND c.age > 30 AND o.total > 100",
    )
    .unwrap();
    let expected = json!({
        "type": "project",
        "columns": [
            { "table": "c", "attr": "name" },
            { "table": "o", "attr": "total" },
        ],
        "input": {
            "type": "select",
            "condition": {
                "type": "AND",
                "left": {
                    "type": "AND",
                    "left": {
                        "type": "EQ",
                        "left": { "table": "c", "attr": "id" },
                        "right": { "type": "column", "table": "o", "attr": "cid" },
                    },
                    "right": {
                        "type": "GT",
                        "left": { "table": "c", "attr": "age" },
                        "right": { "type": "int", "value": 30 },
                    },
                },
                "right": {
                    "type": "GT",
                    "left": { "table": "o", "attr": "total" },
                    "right": { "type": "int", "value": 100 },
                },
            },
            "input": {
                "type": "join",
                "left": {
                    "type": "base_relation",
                    "tables": [{ "name": "customers", "alias": "c" }],
                },
                "right": {
                    "type": "base_relation",
                    "tables": [{ "name": "orders", "alias": "o" }],
                },
            },
        },
    });
    assert_eq!(sql2ra::serialize::ra_tree_to_json(&tree), expected);
}

#[test]
fn test_disjunction_spanning_a_join_stays_above_it() {
    let tree = sql2ra::plan_query(
        "SELECT * FROM a JOIN b ON a.x = b.x WHERE a.y = 1 OR b.z = 2",
    )
    .unwrap();
    let expected = json!({
        "type": "select",
        "condition": {
            "type": "OR",
            "left": {
                "type": "EQ",
                "left": { "table": "a", "attr": "y" },
                "right": { "type": "int", "value": 1 },
            },
            "right": {
                "type": "EQ",
                "left": { "table": "b", "attr": "z" },
                "right": { "type": "int", "value": 2 },
            },
        },
        "input": {
            "type": "join",
            "condition": {
                "type": "EQ",
                "left": { "table": "a", "attr": "x" },
                "right": { "type": "column", "table": "b", "attr": "x" },
            },
            "left": { "type": "base_relation", "tables": [{ "name": "a" }] },
            "right": { "type": "base_relation", "tables": [{ "name": "b" }] },
        },
    });
    assert_eq!(sql2ra::serialize::ra_tree_to_json(&tree), expected);
}

#[test]
fn test_filter_on_a_subquery_alias_stays_outside_it() {
    let tree =
        sql2ra::plan_query("SELECT * FROM (SELECT x FROM t) AS s WHERE s.x = 5").unwrap();
    let expected = json!({
        "type": "select",
        "condition": {
            "type": "EQ",
            "left": { "table": "s", "attr": "x" },
            "right": { "type": "int", "value": 5 },
        },
        "input": {
            "type": "subquery",
            "alias": "s",
            "query": {
                "type": "project",
                "columns": [{ "attr": "x" }],
                "input": { "type": "base_relation", "tables": [{ "name": "t" }] },
            },
        },
    });
    assert_eq!(sql2ra::serialize::ra_tree_to_json(&tree), expected);
}

#[test]
fn test_queries_span_lines_and_ignore_keyword_case() {
    let tree = sql2ra::plan_query(
        "select c.name\nfrom customers c\nwhere c.age > 30;",
    )
    .unwrap();
    let expected = json!({
        "type": "project",
        "columns": [{ "table": "c", "attr": "name" }],
        "input": {
            "type": "select",
            "condition": {
                "type": "GT",
                "left": { "table": "c", "attr": "age" },
                "right": { "type": "int", "value": 30 },
            },
            "input": {
                "type": "base_relation",
                "tables": [{ "name": "customers", "alias": "c" }],
            },
        },
    });
    assert_eq!(sql2ra::serialize::ra_tree_to_json(&tree), expected);
}

#[test]
fn test_subquery_without_alias_is_rejected() {
    let err = sql2ra::plan_query("SELECT * FROM (SELECT x FROM t)").unwrap_err();
    assert!(err.to_string().contains("alias"), "got: {}", err);
}

#[test]
fn test_reference_to_undeclared_relation_is_rejected() {
    let err = sql2ra::plan_query("SELECT * FROM t WHERE q.x = 1").unwrap_err();
    assert!(err.to_string().contains("q.x"), "got: {}", err);
}

#[test]
fn test_integer_literal_out_of_range_is_rejected() {
    // One past i64::MAX parses as SQL but has no planner value.
    let err = sql2ra::plan_query("SELECT * FROM t WHERE t.x = 9223372036854775808").unwrap_err();
    assert!(err.to_string().contains("out of range"), "got: {}", err);
}

#[test]
fn test_syntax_errors_point_at_the_offending_token() {
    let err = sql2ra::plan_query("SELECT FROM t").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("SQL syntax error"), "got: {}", msg);
    // The pest report underlines the position in the input.
    assert!(msg.contains("-->"), "got: {}", msg);
}

#[test]
fn test_planned_output_is_valid_json_text() {
    let tree = sql2ra::plan_query("SELECT * FROM t WHERE t.x = 1").unwrap();
    let text = sql2ra::serialize::ra_tree_to_string(&tree);
    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reparsed, sql2ra::serialize::ra_tree_to_json(&tree));
}
