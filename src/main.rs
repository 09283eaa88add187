use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Plan a SQL select statement and print the relational algebra tree as JSON.
#[derive(Parser, Debug)]
#[command(name = "sql2ra")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the statement to plan. Reads stdin when omitted.
    sql_file: Option<PathBuf>,

    /// Print the naive tree without relocating any filters.
    #[arg(long)]
    no_pushdown: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let query = match &cli.sql_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("could not read stdin")?;
            buf
        }
    };

    let tree = if cli.no_pushdown {
        sql2ra::plan_query_unoptimized(&query)?
    } else {
        sql2ra::plan_query(&query)?
    };
    println!("{}", sql2ra::serialize::ra_tree_to_string(&tree));
    Ok(())
}
