//! `predicate` has the boolean predicate manipulations that selection
//! pushdown is built from: splitting AND chains into conjuncts,
//! reassembling them, and inspecting which relations a predicate mentions.

use std::collections::BTreeSet;

use crate::ast::{ColumnRef, Operand, Predicate};

/// The set of relation qualifiers a predicate mentions. Unqualified
/// columns contribute nothing here; `has_unqualified` reports them.
pub fn footprint(p: &Predicate) -> BTreeSet<String> {
    let mut qualifiers = BTreeSet::new();
    collect_qualifiers(p, &mut qualifiers);
    qualifiers
}

fn collect_qualifiers(p: &Predicate, out: &mut BTreeSet<String>) {
    match p {
        Predicate::Comparison { left, right, .. } => {
            if let Some(q) = &left.qualifier {
                out.insert(q.clone());
            }
            if let Some(q) = right.as_column().and_then(|c| c.qualifier.as_ref()) {
                out.insert(q.clone());
            }
        }
        Predicate::And { left, right } | Predicate::Or { left, right } => {
            collect_qualifiers(left, out);
            collect_qualifiers(right, out);
        }
        Predicate::Not { operand } => collect_qualifiers(operand, out),
    }
}

/// Every column reference in the predicate, in left-to-right order.
pub fn columns(p: &Predicate) -> Vec<&ColumnRef> {
    let mut out = vec![];
    collect_columns(p, &mut out);
    out
}

fn collect_columns<'a>(p: &'a Predicate, out: &mut Vec<&'a ColumnRef>) {
    match p {
        Predicate::Comparison { left, right, .. } => {
            out.push(left);
            if let Some(c) = right.as_column() {
                out.push(c);
            }
        }
        Predicate::And { left, right } | Predicate::Or { left, right } => {
            collect_columns(left, out);
            collect_columns(right, out);
        }
        Predicate::Not { operand } => collect_columns(operand, out),
    }
}

/// True if the predicate contains a column reference with no qualifier.
pub fn has_unqualified(p: &Predicate) -> bool {
    match p {
        Predicate::Comparison { left, right, .. } => {
            left.qualifier.is_none()
                || matches!(right, Operand::Column(c) if c.qualifier.is_none())
        }
        Predicate::And { left, right } | Predicate::Or { left, right } => {
            has_unqualified(left) || has_unqualified(right)
        }
        Predicate::Not { operand } => has_unqualified(operand),
    }
}

/// Splits a predicate into the conjuncts joined by its top-level ANDs, in
/// left-to-right order. OR and NOT nodes are opaque and come back whole.
pub fn decompose_conjunction(p: Predicate) -> Vec<Predicate> {
    match p {
        Predicate::And { left, right } => {
            let mut conjuncts = decompose_conjunction(*left);
            conjuncts.extend(decompose_conjunction(*right));
            conjuncts
        }
        other => vec![other],
    }
}

/// Reassembles conjuncts into a left-leaning AND chain, or None for an
/// empty list. `decompose_conjunction` on the result yields the same
/// conjuncts in the same order.
pub fn recompose(conjuncts: Vec<Predicate>) -> Option<Predicate> {
    let mut iter = conjuncts.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, Predicate::and))
}

/// Rewrites every qualifier equal to `from` into `to`. Used when a
/// predicate moves through a rename, where the outer name and the inner
/// name denote the same relation.
pub fn rewrite_qualifier(p: Predicate, from: &str, to: &str) -> Predicate {
    match p {
        Predicate::Comparison { op, left, right } => Predicate::Comparison {
            op,
            left: rewrite_column(left, from, to),
            right: match right {
                Operand::Column(c) => Operand::Column(rewrite_column(c, from, to)),
                literal => literal,
            },
        },
        Predicate::And { left, right } => Predicate::and(
            rewrite_qualifier(*left, from, to),
            rewrite_qualifier(*right, from, to),
        ),
        Predicate::Or { left, right } => Predicate::or(
            rewrite_qualifier(*left, from, to),
            rewrite_qualifier(*right, from, to),
        ),
        Predicate::Not { operand } => Predicate::not(rewrite_qualifier(*operand, from, to)),
    }
}

fn rewrite_column(mut c: ColumnRef, from: &str, to: &str) -> ColumnRef {
    if c.qualifier.as_deref() == Some(from) {
        c.qualifier = Some(String::from(to));
    }
    c
}

/// Parses a bare predicate for tests.
#[cfg(test)]
pub fn predicate_from_str(s: &str) -> Predicate {
    use crate::parser::{Rule, SQLParser};
    use crate::pest::Parser;
    let pair = SQLParser::parse(Rule::predicate, s)
        .expect("unsuccessful parse")
        .next()
        .unwrap();
    crate::parser::parse_predicate(pair.into_inner()).unwrap()
}

#[cfg(test)]
fn qualifier_set(names: Vec<&str>) -> BTreeSet<String> {
    names.into_iter().map(String::from).collect()
}

#[test]
fn test_footprint() {
    let cases = vec![
        ("a.x = 1", vec!["a"]),
        ("a.x = b.y", vec!["a", "b"]),
        ("a.x = 1 AND (b.y = 2 OR c.z = 3)", vec!["a", "b", "c"]),
        ("NOT a.x = a.y", vec!["a"]),
        ("x = 1", vec![]),
        ("x = a.y", vec!["a"]),
    ];
    for case in cases {
        let p = predicate_from_str(case.0);
        assert_eq!(footprint(&p), qualifier_set(case.1), "footprint of {}", case.0);
    }
}

#[test]
fn test_columns() {
    let p = predicate_from_str("a.x = b.y AND NOT (c.z = 1 OR w = 2)");
    let names: Vec<String> = columns(&p).iter().map(|c| c.to_string()).collect();
    assert_eq!(names, vec!["a.x", "b.y", "c.z", "w"]);
}

#[test]
fn test_has_unqualified() {
    let cases = vec![
        ("a.x = 1", false),
        ("a.x = b.y", false),
        ("x = 1", true),
        ("a.x = y", true),
        ("a.x = 1 AND y = 2", true),
        ("NOT (a.x = 1 OR y = 2)", true),
    ];
    for case in cases {
        let p = predicate_from_str(case.0);
        assert_eq!(has_unqualified(&p), case.1, "has_unqualified of {}", case.0);
    }
}

#[test]
fn test_decompose_conjunction() {
    let cases = vec![
        ("a.x = 1", vec!["a.x = 1"]),
        ("a.x = 1 AND b.y = 2", vec!["a.x = 1", "b.y = 2"]),
        (
            "a.x = 1 AND b.y = 2 AND c.z = 3",
            vec!["a.x = 1", "b.y = 2", "c.z = 3"],
        ),
        ("a.x = 1 OR b.y = 2", vec!["(a.x = 1 OR b.y = 2)"]),
        (
            "(a.x = 1 OR b.y = 2) AND c.z = 3",
            vec!["(a.x = 1 OR b.y = 2)", "c.z = 3"],
        ),
        ("NOT (a.x = 1 AND b.y = 2)", vec!["(NOT (a.x = 1 AND b.y = 2))"]),
        // Nested ANDs flatten regardless of grouping.
        (
            "(a.x = 1 AND b.y = 2) AND (c.z = 3 AND d.w = 4)",
            vec!["a.x = 1", "b.y = 2", "c.z = 3", "d.w = 4"],
        ),
    ];
    for case in cases {
        let conjuncts = decompose_conjunction(predicate_from_str(case.0));
        let actual: Vec<String> = conjuncts.iter().map(|c| format!("{}", c)).collect();
        let expected: Vec<String> = case.1.iter().map(|s| String::from(*s)).collect();
        assert_eq!(actual, expected, "conjuncts of {}", case.0);
    }
}

#[test]
fn test_recompose() {
    assert_eq!(recompose(vec![]), None);

    let one = predicate_from_str("a.x = 1");
    assert_eq!(recompose(vec![one.clone()]), Some(one));

    let conjuncts = decompose_conjunction(predicate_from_str("a.x = 1 AND b.y = 2 AND c.z = 3"));
    let rebuilt = recompose(conjuncts.clone()).unwrap();
    assert_eq!(format!("{}", rebuilt), "((a.x = 1 AND b.y = 2) AND c.z = 3)");
    // Decompose of the rebuilt chain gives the same conjuncts back.
    assert_eq!(decompose_conjunction(rebuilt), conjuncts);
}

#[test]
fn test_rewrite_qualifier() {
    let p = predicate_from_str("r.x = 1 AND r.y = t.z");
    let rewritten = rewrite_qualifier(p, "r", "emp");
    assert_eq!(format!("{}", rewritten), "(emp.x = 1 AND emp.y = t.z)");

    // Unqualified columns and other qualifiers are untouched.
    let p = predicate_from_str("x = 1 OR NOT t.y = 2");
    let rewritten = rewrite_qualifier(p, "r", "emp");
    assert_eq!(format!("{}", rewritten), "(x = 1 OR (NOT t.y = 2))");
}
