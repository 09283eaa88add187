//! `optimize_ra` rewrites RA trees so selections run as early as possible.
//! - splits WHERE conjunctions and sinks each conjunct toward the leaves.
//! - folds conjuncts spanning both sides of a join into the join condition,
//!   turning cross products into conditioned joins.
//!
//! Rewrites never change the rows a tree denotes. A conjunct only moves to
//! a position where every relation it references is still visible, and a
//! conjunct with no legal lower position stays where it is, so the pass is
//! total and cannot fail.

use crate::ast::Predicate;
use crate::predicate::{
    decompose_conjunction, footprint, has_unqualified, recompose, rewrite_qualifier,
};
use crate::ra;
use crate::ra::RaNode;
use crate::resolve::Scope;

pub fn pushdown_selections(node: RaNode) -> RaNode {
    match node {
        RaNode::Select(sel) => {
            let mut input = *sel.input;
            let mut stranded: Vec<Predicate> = vec![];
            for conjunct in decompose_conjunction(sel.condition) {
                match try_push(input, conjunct) {
                    Ok(rewritten) => input = rewritten,
                    Err((unchanged, conjunct)) => {
                        log::debug!("conjunct [{}] stays at its selection", conjunct);
                        input = unchanged;
                        stranded.push(conjunct);
                    }
                }
            }
            let input = pushdown_selections(input);
            match recompose(stranded) {
                Some(condition) => RaNode::select(condition, input),
                None => input,
            }
        }
        RaNode::Join(join) => {
            let mut left = *join.left;
            let mut right = *join.right;
            let mut kept: Vec<Predicate> = vec![];
            let conjuncts = match join.condition {
                Some(condition) => decompose_conjunction(condition),
                None => vec![],
            };
            for conjunct in conjuncts {
                let fp = footprint(&conjunct);
                if !has_unqualified(&conjunct) && Scope::of(&left).covers(&fp) {
                    log::debug!("join condition conjunct [{}] sinks into the left side", conjunct);
                    left = push_or_wrap(left, conjunct);
                } else if !has_unqualified(&conjunct) && Scope::of(&right).covers(&fp) {
                    log::debug!("join condition conjunct [{}] sinks into the right side", conjunct);
                    right = push_or_wrap(right, conjunct);
                } else {
                    kept.push(conjunct);
                }
            }
            RaNode::Join(ra::Join {
                condition: recompose(kept),
                left: Box::new(pushdown_selections(left)),
                right: Box::new(pushdown_selections(right)),
            })
        }
        RaNode::Project(p) => RaNode::Project(ra::Project {
            columns: p.columns,
            input: Box::new(pushdown_selections(*p.input)),
        }),
        RaNode::Rename(rn) => RaNode::Rename(ra::Rename {
            old_name: rn.old_name,
            new_name: rn.new_name,
            input: Box::new(pushdown_selections(*rn.input)),
        }),
        // A subquery interior is a scope of its own; it is optimized as an
        // independent tree and outer conjuncts never enter it.
        RaNode::Subquery(sq) => RaNode::Subquery(ra::Subquery {
            alias: sq.alias,
            input: Box::new(pushdown_selections(*sq.input)),
        }),
        RaNode::Base(_) => node,
    }
}

/// Attempts to sink one conjunct into `node`. `Ok` means the conjunct was
/// absorbed at or below the node; `Err` hands back the node untouched with
/// the conjunct, which then belongs directly above it.
fn try_push(node: RaNode, conjunct: Predicate) -> Result<RaNode, (RaNode, Predicate)> {
    match node {
        RaNode::Join(join) => {
            let fp = footprint(&conjunct);
            if !has_unqualified(&conjunct) && Scope::of(&join.left).covers(&fp) {
                log::debug!("pushing [{}] into the left side of a join", conjunct);
                Ok(RaNode::Join(ra::Join {
                    condition: join.condition,
                    left: Box::new(push_or_wrap(*join.left, conjunct)),
                    right: join.right,
                }))
            } else if !has_unqualified(&conjunct) && Scope::of(&join.right).covers(&fp) {
                log::debug!("pushing [{}] into the right side of a join", conjunct);
                Ok(RaNode::Join(ra::Join {
                    condition: join.condition,
                    left: join.left,
                    right: Box::new(push_or_wrap(*join.right, conjunct)),
                }))
            } else if conjunct.is_comparison() {
                // Spans both sides. Evaluating it as part of the join is
                // equivalent to a selection directly above the join.
                log::debug!("folding [{}] into a join condition", conjunct);
                let condition = match join.condition {
                    Some(existing) => Predicate::and(existing, conjunct),
                    None => conjunct,
                };
                Ok(RaNode::Join(ra::Join {
                    condition: Some(condition),
                    left: join.left,
                    right: join.right,
                }))
            } else {
                // A disjunction or negation spanning both sides stays a
                // selection above the join; it is not a join predicate.
                Err((RaNode::Join(join), conjunct))
            }
        }
        RaNode::Project(p) => {
            // Column pruning hides attributes, not relations, so coverage
            // is judged on the relations below the projection.
            if Scope::of(&p.input).covers(&footprint(&conjunct)) {
                Ok(RaNode::Project(ra::Project {
                    columns: p.columns,
                    input: Box::new(push_or_wrap(*p.input, conjunct)),
                }))
            } else {
                Err((RaNode::Project(p), conjunct))
            }
        }
        RaNode::Rename(rn) => {
            let rewritten = rewrite_qualifier(conjunct, &rn.new_name, &rn.old_name);
            if Scope::of(&rn.input).covers(&footprint(&rewritten)) {
                log::debug!("pushing [{}] through a rename", rewritten);
                Ok(RaNode::Rename(ra::Rename {
                    old_name: rn.old_name.clone(),
                    new_name: rn.new_name.clone(),
                    input: Box::new(push_or_wrap(*rn.input, rewritten)),
                }))
            } else {
                let conjunct = rewrite_qualifier(rewritten, &rn.old_name, &rn.new_name);
                Err((RaNode::Rename(rn), conjunct))
            }
        }
        RaNode::Select(inner) => {
            // Merge rather than tunnel past; the merged condition is
            // revisited when the pass reaches this selection.
            log::debug!("merging [{}] into a selection already pushed here", conjunct);
            Ok(RaNode::Select(ra::Select {
                condition: Predicate::and(inner.condition, conjunct),
                input: inner.input,
            }))
        }
        RaNode::Base(_) | RaNode::Subquery(_) => Err((node, conjunct)),
    }
}

/// Sinks the conjunct into `node` if possible, else attaches it as a
/// selection directly above it.
fn push_or_wrap(node: RaNode, conjunct: Predicate) -> RaNode {
    match try_push(node, conjunct) {
        Ok(rewritten) => rewritten,
        Err((unchanged, conjunct)) => RaNode::select(conjunct, unchanged),
    }
}

#[cfg(test)]
use crate::ast::{ColumnRef, Relation};
#[cfg(test)]
use crate::predicate::predicate_from_str;

#[cfg(test)]
fn plan(query: &str) -> RaNode {
    let ss = crate::pt_to_ast::pt_select_statement_to_ast(query).unwrap();
    crate::ast_to_ra::ast_select_statement_to_ra(&ss).unwrap()
}

/// Display strings of every comparison in the tree, sorted. Two trees with
/// equal multisets carry the same atomic filters.
#[cfg(test)]
fn comparison_multiset(node: &RaNode) -> Vec<String> {
    fn predicate_comparisons(p: &Predicate, out: &mut Vec<String>) {
        match p {
            Predicate::Comparison { .. } => out.push(format!("{}", p)),
            Predicate::And { left, right } | Predicate::Or { left, right } => {
                predicate_comparisons(left, out);
                predicate_comparisons(right, out);
            }
            Predicate::Not { operand } => predicate_comparisons(operand, out),
        }
    }
    fn walk(node: &RaNode, out: &mut Vec<String>) {
        match node {
            RaNode::Select(sel) => {
                predicate_comparisons(&sel.condition, out);
                walk(&sel.input, out);
            }
            RaNode::Join(join) => {
                if let Some(c) = &join.condition {
                    predicate_comparisons(c, out);
                }
                walk(&join.left, out);
                walk(&join.right, out);
            }
            RaNode::Project(p) => walk(&p.input, out),
            RaNode::Rename(rn) => walk(&rn.input, out),
            RaNode::Subquery(sq) => walk(&sq.input, out),
            RaNode::Base(_) => (),
        }
    }
    let mut out = vec![];
    walk(node, &mut out);
    out.sort();
    out
}

#[test]
fn test_conjuncts_split_across_join_sides() {
    // One conjunct per side, and the cross product becomes a real join.
    let optimized =
        pushdown_selections(plan("SELECT a.x FROM a, b WHERE a.y = 1 AND b.z = 2 AND a.x = b.x"));
    let expected = RaNode::project(
        vec![ColumnRef::qualified("a", "x")],
        RaNode::join(
            Some(predicate_from_str("a.x = b.x")),
            RaNode::select(predicate_from_str("a.y = 1"), RaNode::base(Relation::named("a"))),
            RaNode::select(predicate_from_str("b.z = 2"), RaNode::base(Relation::named("b"))),
        ),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_join_on_condition_conjuncts_sink_too() {
    let optimized = pushdown_selections(plan(
        "SELECT * FROM a JOIN b ON a.x = b.x AND b.z = 2",
    ));
    let expected = RaNode::join(
        Some(predicate_from_str("a.x = b.x")),
        RaNode::base(Relation::named("a")),
        RaNode::select(predicate_from_str("b.z = 2"), RaNode::base(Relation::named("b"))),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_disjunction_spanning_join_stays_above() {
    let optimized = pushdown_selections(plan(
        "SELECT * FROM a JOIN b ON a.x = b.x WHERE a.y = 1 OR b.z = 2",
    ));
    let expected = RaNode::select(
        predicate_from_str("a.y = 1 OR b.z = 2"),
        RaNode::join(
            Some(predicate_from_str("a.x = b.x")),
            RaNode::base(Relation::named("a")),
            RaNode::base(Relation::named("b")),
        ),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_single_sided_disjunction_still_sinks() {
    let optimized =
        pushdown_selections(plan("SELECT * FROM a, b WHERE (a.x = 1 OR a.y = 2) AND b.z = 3"));
    let expected = RaNode::join(
        None,
        RaNode::select(
            predicate_from_str("a.x = 1 OR a.y = 2"),
            RaNode::base(Relation::named("a")),
        ),
        RaNode::select(predicate_from_str("b.z = 3"), RaNode::base(Relation::named("b"))),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_selection_stops_above_subquery() {
    let optimized =
        pushdown_selections(plan("SELECT * FROM (SELECT x FROM a) AS s WHERE s.x = 5"));
    let expected = RaNode::select(
        predicate_from_str("s.x = 5"),
        RaNode::subquery(
            "s",
            RaNode::project(
                vec![ColumnRef::unqualified("x")],
                RaNode::base(Relation::named("a")),
            ),
        ),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_subquery_interior_is_optimized_independently() {
    let optimized = pushdown_selections(plan(
        "SELECT s.x FROM (SELECT t.x FROM t, u WHERE t.y = 2 AND t.id = u.id) s WHERE s.x < 10",
    ));
    let expected = RaNode::project(
        vec![ColumnRef::qualified("s", "x")],
        RaNode::select(
            predicate_from_str("s.x < 10"),
            RaNode::subquery(
                "s",
                RaNode::project(
                    vec![ColumnRef::qualified("t", "x")],
                    RaNode::join(
                        Some(predicate_from_str("t.id = u.id")),
                        RaNode::select(
                            predicate_from_str("t.y = 2"),
                            RaNode::base(Relation::named("t")),
                        ),
                        RaNode::base(Relation::named("u")),
                    ),
                ),
            ),
        ),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_unqualified_conjunct_never_picks_a_join_side() {
    // `y = 1` could belong to either relation, so it may not sink into one
    // side; as a comparison it is still safe as part of the join condition.
    let optimized = pushdown_selections(plan("SELECT * FROM a, b WHERE y = 1"));
    let expected = RaNode::join(
        Some(predicate_from_str("y = 1")),
        RaNode::base(Relation::named("a")),
        RaNode::base(Relation::named("b")),
    );
    assert_eq!(optimized, expected);

    // With a single relation there is nothing to confuse; it sinks.
    let optimized = pushdown_selections(plan("SELECT a.x FROM a WHERE y = 1"));
    let expected = RaNode::project(
        vec![ColumnRef::qualified("a", "x")],
        RaNode::select(predicate_from_str("y = 1"), RaNode::base(Relation::named("a"))),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_pushdown_through_rename() {
    // Hand-built: the planner does not emit renames, but the pass handles
    // them for trees built directly.
    let tree = RaNode::select(
        predicate_from_str("r.x = 1 AND r.y = 2"),
        RaNode::rename("t", "r", RaNode::base(Relation::named("t"))),
    );
    let optimized = pushdown_selections(tree);
    let expected = RaNode::rename(
        "t",
        "r",
        RaNode::select(
            predicate_from_str("t.x = 1 AND t.y = 2"),
            RaNode::base(Relation::named("t")),
        ),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_pushdown_through_project_ignores_column_list() {
    // The projected list does not mention a.y; the conjunct still passes
    // because relation a is visible below the projection.
    let tree = RaNode::select(
        predicate_from_str("a.y = 1"),
        RaNode::project(
            vec![ColumnRef::qualified("a", "x")],
            RaNode::base(Relation::named("a")),
        ),
    );
    let optimized = pushdown_selections(tree);
    let expected = RaNode::project(
        vec![ColumnRef::qualified("a", "x")],
        RaNode::select(predicate_from_str("a.y = 1"), RaNode::base(Relation::named("a"))),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_pushdown_is_idempotent() {
    let queries = vec![
        "SELECT a.x FROM a, b WHERE a.y = 1 AND b.z = 2 AND a.x = b.x",
        "SELECT * FROM a JOIN b ON a.x = b.x WHERE a.y = 1 OR b.z = 2",
        "SELECT * FROM (SELECT x FROM a) AS s WHERE s.x = 5",
        "SELECT * FROM a, b, c WHERE a.x = b.x AND b.y = c.y AND c.z = 3",
        "SELECT t.x FROM t WHERE NOT t.x = 1 AND t.y = 2",
    ];
    for query in queries {
        let once = pushdown_selections(plan(query));
        let twice = pushdown_selections(once.clone());
        assert_eq!(once, twice, "pushdown moved again on {}", query);
    }
}

#[test]
fn test_pushdown_conserves_comparisons() {
    let queries = vec![
        "SELECT a.x FROM a, b WHERE a.y = 1 AND b.z = 2 AND a.x = b.x",
        "SELECT * FROM a JOIN b ON a.x = b.x AND a.w = 1 WHERE a.y = 1 OR b.z = 2",
        "SELECT * FROM a, b, c WHERE a.x = b.x AND b.y = c.y AND NOT c.z = 3",
        "SELECT s.x FROM (SELECT t.x FROM t WHERE t.y = 2) s WHERE s.x < 10",
    ];
    for query in queries {
        let naive = plan(query);
        let before = comparison_multiset(&naive);
        let after = comparison_multiset(&pushdown_selections(naive));
        assert_eq!(before, after, "comparisons changed for {}", query);
    }
}

#[test]
fn test_three_way_join_chain() {
    // Each equality lands on the deepest join where both its relations are
    // visible; the leaf filter lands on its scan.
    let optimized = pushdown_selections(plan(
        "SELECT * FROM a, b, c WHERE a.x = b.x AND b.y = c.y AND c.z = 3",
    ));
    let expected = RaNode::join(
        Some(predicate_from_str("b.y = c.y")),
        RaNode::join(
            Some(predicate_from_str("a.x = b.x")),
            RaNode::base(Relation::named("a")),
            RaNode::base(Relation::named("b")),
        ),
        RaNode::select(predicate_from_str("c.z = 3"), RaNode::base(Relation::named("c"))),
    );
    assert_eq!(optimized, expected);
}

#[test]
fn test_negation_of_single_relation_sinks() {
    let optimized = pushdown_selections(plan("SELECT * FROM a, b WHERE NOT a.x = 1"));
    let expected = RaNode::join(
        None,
        RaNode::select(predicate_from_str("NOT a.x = 1"), RaNode::base(Relation::named("a"))),
        RaNode::base(Relation::named("b")),
    );
    assert_eq!(optimized, expected);
}
