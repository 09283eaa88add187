pub mod ast;
pub mod ast_to_ra;
pub mod optimize_ra;
pub mod parser;
pub mod predicate;
pub mod pt_to_ast;
pub mod ra;
pub mod resolve;
pub mod serialize;

extern crate pest;
#[macro_use]
extern crate pest_derive;

use anyhow::Result;

/// Plans a SQL select statement into a relational algebra tree with
/// selections pushed toward the leaves.
pub fn plan_query(query: &str) -> Result<ra::RaNode> {
    // Convert parse tree to AST.
    let ss: ast::SelectStatement = pt_to_ast::pt_select_statement_to_ast(query)?;
    // Convert the AST to a naive RA tree with all filtering at the top.
    let naive: ra::RaNode = ast_to_ra::ast_select_statement_to_ra(&ss)?;
    // Relocate each filter to the lowest node that still sees its relations.
    Ok(optimize_ra::pushdown_selections(naive))
}

/// Plans a statement but skips the pushdown pass, leaving the naive tree.
pub fn plan_query_unoptimized(query: &str) -> Result<ra::RaNode> {
    let ss = pt_to_ast::pt_select_statement_to_ast(query)?;
    Ok(ast_to_ra::ast_select_statement_to_ra(&ss)?)
}
