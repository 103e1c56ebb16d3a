use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use indexer::color::ColorConfig;
use indexer::searcher::Mode;
use indexer::{run_index, run_search, IndexConfig, SearchConfig};

#[derive(Parser, Debug)]
#[command(
    name = "indexer",
    about = "A full-text search engine for a local directory of .txt/.md files",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or incrementally update the index for a directory
    Index {
        #[arg(short = 'd', long = "dir", help = "Directory to index")]
        dir: Option<PathBuf>,
        #[arg(short = 'o', long = "out", help = "Path to write the index file")]
        out: Option<PathBuf>,
    },
    /// Query an index with a boolean AND/OR term expression
    Search {
        #[arg(short = 'i', long = "index", help = "Path to the index file")]
        index: Option<PathBuf>,
        #[arg(short = 'q', long = "query", help = "Search query")]
        query: Option<String>,
        #[arg(
            short = 'm',
            long = "mode",
            default_value = "and",
            help = "'and' or 'or'"
        )]
        mode: String,
        #[arg(
            long = "adapter",
            help = "Emit the score-prefixed single-line adapter format"
        )]
        adapter: bool,
    },
}

const DEFAULT_INDEX_FILE: &str = "myindex.idx";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let colors = ColorConfig::from_env();

    match args.command {
        Commands::Index { dir, out } => {
            let root_dir = match dir {
                Some(p) => p,
                None => std::env::current_dir().context("get current directory")?,
            };
            let index_path = out.unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_FILE));

            run_index(&IndexConfig {
                root_dir,
                index_path,
            })?;
        }
        Commands::Search {
            index,
            query,
            mode,
            adapter,
        } => {
            let query = query.context("missing required argument '--query'")?;
            if query.trim().is_empty() {
                anyhow::bail!("query must not be empty");
            }
            let index_path = index.context("missing required argument '--index'")?;
            let mode = Mode::parse(&mode)?;
            run_search(
                &SearchConfig {
                    index_path,
                    query,
                    mode,
                    adapter,
                },
                &colors,
            )?;
        }
    }

    Ok(())
}
