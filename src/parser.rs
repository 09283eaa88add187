//! `parser` contains generated parsing routines for SQL and tests on them.

use pest::iterators::Pairs;
use pest::pratt_parser::PrattParser;

use crate::ast;

#[allow(unused_imports)]
use pest::Parser; // This needs to be in scope for the next statements to work.
#[derive(Parser)]
#[grammar = "sql.pest"]
pub struct SQLParser;

// From: https://pest.rs/book/examples/calculator.html, MIT,Apache2.0 licenses.
lazy_static::lazy_static! {
    pub static ref PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::{Assoc::*, Op};
        use Rule::*;

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(or_op, Left))
            .op(Op::infix(and_op, Left))
            .op(Op::prefix(not_op))
    };
}

/// Builds a `Predicate` from the inner pairs of a `Rule::predicate`.
pub fn parse_predicate(pairs: Pairs<Rule>) -> Result<ast::Predicate, crate::pt_to_ast::Error> {
    PRATT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::comparison => crate::pt_to_ast::comparison_to_predicate(primary),
            Rule::predicate => parse_predicate(primary.into_inner()),
            rule => unreachable!("parse_predicate expected comparison, found {:?}", rule),
        })
        .map_prefix(|op, operand| match op.as_rule() {
            Rule::not_op => Ok(ast::Predicate::not(operand?)),
            rule => unreachable!("parse_predicate expected prefix NOT, found {:?}", rule),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and_op => Ok(ast::Predicate::and(lhs?, rhs?)),
            Rule::or_op => Ok(ast::Predicate::or(lhs?, rhs?)),
            rule => unreachable!("parse_predicate expected infix connective, found {:?}", rule),
        })
        .parse(pairs)
}

#[test]
fn test_parse_literals() {
    let cases = vec![
        ("1"),
        ("1000000000000"),
        ("-1000000000000"),
        ("1.01"),
        ("123456789.987654321"),
        ("'hi'"),
        ("'New York'"),
    ];
    for case in cases {
        assert!(SQLParser::parse(Rule::literal, case).is_ok());
    }
}

#[test]
fn test_not_parse_invalid_literals() {
    let cases = vec![
        ("A"),
        ("\"hi\""),
        ("the quick brown fox"),
        (".5"),
    ];
    for case in cases {
        assert!(SQLParser::parse(Rule::literal, case).is_err());
    }
}

#[test]
fn test_parse_comparisons() {
    let cases = vec![
        ("a = 1"),
        ("a.x = 1"),
        ("a.x <> 1"),
        ("a.x != 1"),
        ("a.x < 1"),
        ("a.x <= 1"),
        ("a.x > 1"),
        ("a.x >= 1"),
        ("a.x = b.y"),
        ("a.x = 1.5"),
        ("a.x = -2"),
        ("city = 'New York'"),
    ];
    for case in cases {
        match SQLParser::parse(Rule::comparison, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_comparisons() {
    let cases = vec![
        ("5 = a.x"),
        ("'hi' = a.x"),
        ("a.x ="),
        ("a.x"),
        ("= 5"),
    ];
    for case in cases {
        assert!(SQLParser::parse(Rule::comparison, case).is_err());
    }
}

#[test]
fn test_parse_predicates() {
    let cases = vec![
        ("a.x = 1"),
        ("a.x = 1 AND b.y = 2"),
        ("a.x = 1 and b.y = 2 and c.z = 3"),
        ("a.x = 1 OR b.y = 2"),
        ("NOT a.x = 1"),
        ("NOT (a.x = 1 OR b.y = 2)"),
        ("a.x = 1 AND (b.y = 2 OR c.z = 3)"),
        ("(a.x = 1)"),
    ];
    for case in cases {
        match SQLParser::parse(Rule::predicate, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_parse_from_clauses() {
    let cases = vec![
        ("FROM t"),
        ("from t u"),
        ("FROM t AS u"),
        ("FROM t, u"),
        ("FROM t a, u b, v c"),
        ("FROM t JOIN u ON t.x = u.x"),
        ("FROM t a JOIN u b ON a.x = b.x JOIN v c ON b.y = c.y"),
        ("FROM (SELECT x FROM t) s"),
        ("FROM (SELECT x FROM t) AS s"),
        ("FROM (SELECT x FROM t WHERE t.x = 1) s JOIN u ON s.x = u.x"),
    ];
    for case in cases {
        match SQLParser::parse(Rule::from_clause, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_from_clauses() {
    // Rules without an EOI anchor match prefixes, so incomplete JOINs are
    // covered by the select_stmt cases instead.
    let cases = vec![("FROM"), ("FROM 1"), ("FROM ,t")];
    for case in cases {
        assert!(SQLParser::parse(Rule::from_clause, case).is_err());
    }
}

#[test]
fn test_parse_select_statement() {
    let cases = vec![
        ("SELECT * FROM tbl"),
        ("select a,b,c fRoM tbl"),
        ("SELECT a.x, b.y FROM a, b"),
        ("SELECT name FROM employees WHERE employees.salary > 50000"),
        ("SELECT o.total FROM customers c JOIN orders o ON c.id = o.cid WHERE c.city = 'Oslo' AND o.total > 100"),
        ("SELECT s.x FROM (SELECT x FROM t WHERE t.y = 2) s WHERE s.x < 10"),
        ("SELECT * FROM t WHERE NOT t.x = 1"),
        ("SELECT * FROM t;"),
        ("sElEcT a FrOm t WhErE t.x = 1"),
    ];

    for case in cases {
        match SQLParser::parse(Rule::select_stmt, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}

#[test]
fn test_not_parse_invalid_select_statement() {
    let cases = vec![
        ("CREATE * FROM tbl"),
        ("FROM blahblah"),
        ("select \"hi\" from tbl"),
        ("SELECT a FROM"),
        ("SELECT a b FROM t"),
        ("SELECT a, FROM t"),
        ("SELECT a FROM t;;"),
        ("SELECT a FROM t JOIN u"),
        ("SELECT a FROM t JOIN ON t.x = u.x"),
        ("SELECT a FROM t WHERE"),
        ("SELECT a FROM t WHERE 5 = a.x"),
    ];

    for case in cases {
        assert!(SQLParser::parse(Rule::select_stmt, case).is_err());
    }
}

#[test]
fn test_keywords_do_not_swallow_identifiers() {
    // Names that merely begin with a keyword are ordinary identifiers.
    let cases = vec![
        ("SELECT selection FROM fromage"),
        ("SELECT android.x FROM android"),
        ("SELECT ontable.x FROM ontable WHERE ontable.x = 1"),
    ];
    for case in cases {
        match SQLParser::parse(Rule::select_stmt, case) {
            Ok(_) => continue,
            Err(e) => panic!("Error parsing [{}] : {}", case, e),
        }
    }
}
