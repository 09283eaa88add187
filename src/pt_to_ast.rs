//! `pt_to_ast` has routines for converting parse trees to ASTs for SQL.
//! A Pest parse tree has one enum for all possible terminals and non-terminals.
//! Our AST has enums for groups of terminals that are used in the same production.
//! The AST also discards some lexical detail like case and position in the input.

use pest::iterators::Pair;
use thiserror::Error;

use crate::ast;
use crate::parser;
use crate::parser::Rule;
use crate::parser::SQLParser;
use crate::pest::Parser;

#[derive(Error, Debug)]
pub enum Error {
    /// The input did not match the grammar. The wrapped pest error prints
    /// the offending line and a caret at the failing position.
    #[error("SQL syntax error:\n{0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    /// The input matched the grammar but a numeric literal does not fit
    /// the planner's value types.
    #[error("Numeric literal {0} is out of range.")]
    LiteralOutOfRange(String),
}

pub fn pt_select_statement_to_ast(query: &str) -> Result<ast::SelectStatement, Error> {
    let select_stmt = SQLParser::parse(Rule::select_stmt, query)
        .map_err(|e| Error::Syntax(Box::new(e)))?
        .next()
        .unwrap();

    let mut ast = None;
    for s in select_stmt.into_inner() {
        match s.as_rule() {
            Rule::select_body => ast = Some(select_body_to_ast(s)?),
            Rule::EOI => (),
            _ => unreachable!(),
        }
    }
    Ok(ast.unwrap())
}

/// Converts a `Rule::select_body` pair. Also used for the bodies of
/// parenthesized subqueries, which have no EOI of their own.
fn select_body_to_ast(body: Pair<Rule>) -> Result<ast::SelectStatement, Error> {
    let mut select = ast::SelectClause { items: vec![] };
    let mut from = ast::FromClause { items: vec![] };
    let mut where_clause = None;

    for s in body.into_inner() {
        match s.as_rule() {
            Rule::select_items => {
                for t in s.into_inner() {
                    select.items.push(match t.as_rule() {
                        Rule::star => ast::SelItem::Star,
                        Rule::select_item => {
                            let u = t.into_inner().next().unwrap();
                            ast::SelItem::Column(ast::ColumnRef::from_dotted(u.as_str()))
                        }
                        _ => unreachable!(),
                    });
                }
            }
            Rule::from_clause => from = from_clause_to_ast(s)?,
            Rule::where_clause => {
                let predicate = s.into_inner().next().unwrap();
                where_clause = Some(parser::parse_predicate(predicate.into_inner())?);
            }
            _ => unreachable!(),
        }
    }
    Ok(ast::SelectStatement {
        select,
        from,
        where_clause,
    })
}

fn from_clause_to_ast(fc: Pair<Rule>) -> Result<ast::FromClause, Error> {
    use itertools::Itertools;
    let mut items = vec![];
    for f in fc.into_inner() {
        match f.as_rule() {
            Rule::from_item => items.push(ast::FromItem {
                source: from_item_to_source(f)?,
                condition: None,
            }),
            Rule::join_clause => {
                let (item, predicate) = f.into_inner().collect_tuple().unwrap();
                items.push(ast::FromItem {
                    source: from_item_to_source(item)?,
                    condition: Some(parser::parse_predicate(predicate.into_inner())?),
                });
            }
            _ => unreachable!(),
        }
    }
    Ok(ast::FromClause { items })
}

fn from_item_to_source(item: Pair<Rule>) -> Result<ast::Source, Error> {
    let inner = item.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::table_ref => {
            let mut parts = inner.into_inner();
            let name = parts.next().unwrap().as_str();
            Ok(match parts.next() {
                Some(alias) => ast::Source::Table(ast::Relation::aliased(
                    name,
                    &alias_clause_to_string(alias),
                )),
                None => ast::Source::Table(ast::Relation::named(name)),
            })
        }
        Rule::subquery_ref => {
            let mut parts = inner.into_inner();
            let body = parts.next().unwrap();
            let alias = parts.next().map(alias_clause_to_string);
            Ok(ast::Source::Subquery {
                query: Box::new(select_body_to_ast(body)?),
                alias,
            })
        }
        _ => unreachable!(),
    }
}

fn alias_clause_to_string(alias: Pair<Rule>) -> String {
    String::from(alias.into_inner().next().unwrap().as_str())
}

/// Converts a `Rule::comparison` pair. Called by the Pratt parser in
/// `parser` when it reaches a primary.
pub fn comparison_to_predicate(comparison: Pair<Rule>) -> Result<ast::Predicate, Error> {
    use itertools::Itertools;
    let (left, op, right) = comparison.into_inner().collect_tuple().unwrap();
    let op = match op.as_rule() {
        Rule::eq => ast::CompareOp::Eq,
        Rule::ne => ast::CompareOp::Ne,
        Rule::lt => ast::CompareOp::Lt,
        Rule::le => ast::CompareOp::Le,
        Rule::gt => ast::CompareOp::Gt,
        Rule::ge => ast::CompareOp::Ge,
        rule => unreachable!("comparison_to_predicate expected comparison operator, found {:?}", rule),
    };
    let right = match right.as_rule() {
        Rule::qualified_name => ast::Operand::Column(ast::ColumnRef::from_dotted(right.as_str())),
        _ => ast::Operand::Literal(parse_literal_from_rule(right)?),
    };
    Ok(ast::Predicate::Comparison {
        op,
        left: ast::ColumnRef::from_dotted(left.as_str()),
        right,
    })
}

fn parse_literal_from_rule(pair: Pair<Rule>) -> Result<ast::Literal, Error> {
    match pair.as_rule() {
        Rule::integer_literal => str::parse::<i64>(pair.as_str())
            .map(ast::Literal::Int)
            .map_err(|_| Error::LiteralOutOfRange(String::from(pair.as_str()))),
        Rule::decimal_literal => {
            // Danger: floating point conversion.
            str::parse::<f64>(pair.as_str())
                .map(ast::Literal::Float)
                .map_err(|_| Error::LiteralOutOfRange(String::from(pair.as_str())))
        }
        Rule::single_quoted_string => {
            let s = pair.as_str();
            Ok(ast::Literal::Str(String::from(&s[1..s.len() - 1])))
        }
        _ => {
            panic!(
                "parse_literal_from_rule does not handle {:?}",
                pair.as_rule()
            )
        }
    }
}

#[test]
fn test_parsing_literals() {
    let cases = vec![
        ("1", ast::Literal::Int(1)),
        ("-12", ast::Literal::Int(-12)),
        ("1.01", ast::Literal::Float(1.01)),
        ("'hi'", ast::Literal::Str(String::from("hi"))),
        ("'New York'", ast::Literal::Str(String::from("New York"))),
    ];
    for case in cases {
        let input = case.0;
        let literal = SQLParser::parse(Rule::literal, input)
            .expect("unsuccessful parse") // unwrap the parse result
            .next()
            .unwrap();
        let actual = parse_literal_from_rule(literal).unwrap();
        assert_eq!(actual, case.1);
    }
}

#[test]
fn test_out_of_range_integer_literal_is_an_error() {
    // i64::MAX and i64::MIN are fine; one past MAX is not.
    let cases = vec![
        ("9223372036854775807", true),
        ("-9223372036854775808", true),
        ("9223372036854775808", false),
        ("99999999999999999999999999", false),
    ];
    for case in cases {
        let input = case.0;
        println!("Input: {}", input);
        let literal = SQLParser::parse(Rule::literal, input)
            .expect("unsuccessful parse")
            .next()
            .unwrap();
        let actual = parse_literal_from_rule(literal);
        match actual {
            Ok(_) => assert!(case.1),
            Err(Error::LiteralOutOfRange(s)) => {
                assert!(!case.1);
                assert_eq!(s, input);
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

#[test]
fn test_out_of_range_literal_in_a_query_is_an_error() {
    let err =
        pt_select_statement_to_ast("SELECT * FROM t WHERE t.x = 9223372036854775808").unwrap_err();
    assert!(format!("{}", err).contains("out of range"));
}

#[test]
fn test_pt_select_statement_to_ast() {
    let input = "SELECT o.total FROM customers c JOIN orders o ON c.id = o.cid";
    let actual = pt_select_statement_to_ast(input).unwrap();
    let expected = ast::SelectStatement {
        select: ast::SelectClause {
            items: vec![ast::SelItem::Column(ast::ColumnRef::qualified(
                "o", "total",
            ))],
        },
        from: ast::FromClause {
            items: vec![
                ast::FromItem {
                    source: ast::Source::Table(ast::Relation::aliased("customers", "c")),
                    condition: None,
                },
                ast::FromItem {
                    source: ast::Source::Table(ast::Relation::aliased("orders", "o")),
                    condition: Some(ast::Predicate::comparison(
                        ast::CompareOp::Eq,
                        ast::ColumnRef::qualified("c", "id"),
                        ast::Operand::Column(ast::ColumnRef::qualified("o", "cid")),
                    )),
                },
            ],
        },
        where_clause: None,
    };
    assert_eq!(actual, expected);
}

// Renders an AST as (select item, from source, where predicate) display
// strings so test cases stay short.
#[cfg(test)]
fn ast_select_statement_to_tuple(ss: &ast::SelectStatement) -> (Vec<String>, Vec<String>, Option<String>) {
    (
        ss.select.items.iter().map(|i| format!("{}", i)).collect(),
        ss.from
            .items
            .iter()
            .map(|i| match &i.source {
                ast::Source::Table(r) => format!("{}", r),
                ast::Source::Subquery { alias, .. } => {
                    format!("(subquery) {}", alias.clone().unwrap_or_default())
                }
            })
            .collect(),
        ss.where_clause.as_ref().map(|p| format!("{}", p)),
    )
}

#[test]
fn test_parse_select_statement() {
    let cases = vec![
        ("SELECT * FROM tbl", (vec!["*"], vec!["tbl"], None)),
        (
            "select a,b,c fRoM tbl",
            (vec!["a", "b", "c"], vec!["tbl"], None),
        ),
        (
            "SELECT a.x, b.y FROM a, b",
            (vec!["a.x", "b.y"], vec!["a", "b"], None),
        ),
        (
            "SELECT t.x FROM t WHERE t.x = 1",
            (vec!["t.x"], vec!["t"], Some("t.x = 1")),
        ),
        (
            "SELECT o.total FROM customers c, orders o WHERE c.id = o.cid AND o.total > 100",
            (
                vec!["o.total"],
                vec!["customers c", "orders o"],
                Some("(c.id = o.cid AND o.total > 100)"),
            ),
        ),
        (
            "SELECT s.x FROM (SELECT x FROM t) s",
            (vec!["s.x"], vec!["(subquery) s"], None),
        ),
    ];

    for case in cases {
        let input = case.0;
        println!("Input: {}", input);
        let ss = pt_select_statement_to_ast(input).unwrap();
        let actual = ast_select_statement_to_tuple(&ss);
        let expected = (
            case.1 .0.iter().map(|x| String::from(*x)).collect(),
            case.1 .1.iter().map(|x| String::from(*x)).collect(),
            case.1 .2.map(String::from),
        );
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_predicate_precedence() {
    // NOT binds tighter than AND, AND tighter than OR; parens override.
    let cases = vec![
        (
            "SELECT * FROM t WHERE t.a = 1 OR t.b = 2 AND t.c = 3",
            "(t.a = 1 OR (t.b = 2 AND t.c = 3))",
        ),
        (
            "SELECT * FROM t WHERE t.a = 1 AND t.b = 2 AND t.c = 3",
            "((t.a = 1 AND t.b = 2) AND t.c = 3)",
        ),
        (
            "SELECT * FROM t WHERE NOT t.a = 1 AND t.b = 2",
            "((NOT t.a = 1) AND t.b = 2)",
        ),
        (
            "SELECT * FROM t WHERE NOT (t.a = 1 OR t.b = 2)",
            "(NOT (t.a = 1 OR t.b = 2))",
        ),
        (
            "SELECT * FROM t WHERE (t.a = 1 OR t.b = 2) AND t.c = 3",
            "((t.a = 1 OR t.b = 2) AND t.c = 3)",
        ),
    ];
    for case in cases {
        let ss = pt_select_statement_to_ast(case.0).unwrap();
        let actual = format!("{}", ss.where_clause.unwrap());
        assert_eq!(actual, case.1);
    }
}

#[test]
fn test_syntax_error_is_reported_with_position() {
    let err = pt_select_statement_to_ast("SELECT a FROM").unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("SQL syntax error"));
    // pest renders the failing line with a position marker.
    assert!(msg.contains("-->"));
}

#[test]
fn test_dotted_names_split_at_first_dot() {
    let ss = pt_select_statement_to_ast("SELECT o.a.b FROM o WHERE o.a.b = 1").unwrap();
    let expected = ast::ColumnRef::qualified("o", "a.b");
    assert_eq!(
        ss.select.items[0],
        ast::SelItem::Column(expected.clone())
    );
    match ss.where_clause.unwrap() {
        ast::Predicate::Comparison { left, .. } => assert_eq!(left, expected),
        _ => panic!("expected a comparison"),
    }
}
