pub mod color;
pub mod indexer;
pub mod models;
pub mod searcher;
pub mod store;
pub mod tokenizer;

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;

use color::ColorConfig;
use searcher::{Mode, SearchResult};

/// Wiring for the `index` subcommand: the directory to scan and the index
/// file to update.
pub struct IndexConfig {
    pub root_dir: PathBuf,
    pub index_path: PathBuf,
}

/// Wiring for the `search` subcommand.
pub struct SearchConfig {
    pub index_path: PathBuf,
    pub query: String,
    pub mode: Mode,
    /// Emit the score-prefixed single-line adapter format instead of the
    /// rich multi-line human format.
    pub adapter: bool,
}

/// Builds or incrementally updates the index for `cfg.root_dir` and saves
/// it to `cfg.index_path`.
pub fn run_index(cfg: &IndexConfig) -> anyhow::Result<()> {
    println!("Indexing {}...", cfg.root_dir.display());

    let old_index = store::load(&cfg.index_path).context("load existing index")?;
    let new_index =
        indexer::build_index(&cfg.root_dir, &old_index).context("build index")?;
    store::save(&new_index, &cfg.index_path).context("save index")?;

    println!(
        "Indexed {} document(s) into {}",
        new_index.docs.len(),
        cfg.index_path.display()
    );
    Ok(())
}

/// Loads the index, evaluates the query, prints results in the configured
/// format, and returns them for callers that want to inspect results
/// programmatically (tests, primarily).
pub fn run_search(cfg: &SearchConfig, colors: &ColorConfig) -> anyhow::Result<Vec<SearchResult>> {
    let index = store::load(&cfg.index_path).context("load index")?;

    if index.docs.is_empty() {
        println!("Index is empty, build it first.");
        return Ok(Vec::new());
    }

    let results = searcher::search(&index, &cfg.query, cfg.mode);

    if results.is_empty() {
        println!("No documents found matching your query.");
        return Ok(results);
    }

    if cfg.adapter {
        print_adapter(&results);
    } else {
        print_rich(&results, colors);
    }

    Ok(results)
}

const DISPLAY_POSITIONS: usize = 3;

fn print_rich(results: &[SearchResult], colors: &ColorConfig) {
    for (i, r) in results.iter().enumerate() {
        let header = format!(
            "{}. File: {} (DocID: {}, Score: {:.4})",
            i + 1,
            r.path.display(),
            r.doc_id,
            r.score
        );
        println!("{}", colors.bold(&header));

        let terms: BTreeSet<&String> = r.term_positions.keys().collect();
        let term_parts: Vec<String> = terms
            .iter()
            .map(|term| {
                let positions = &r.term_positions[*term];
                let shown: Vec<String> = positions
                    .iter()
                    .take(DISPLAY_POSITIONS)
                    .map(|p| p.to_string())
                    .collect();
                format!("'{term}' at [{}]", shown.join(" "))
            })
            .collect();
        println!(
            "   Terms: {} (TotalWordsInDoc: {})",
            term_parts.join("; "),
            r.total_words
        );

        for snippet in &r.snippets {
            println!("   Snippet: {snippet}");
        }
        println!("   ---");
    }
}

/// One line per result: `score: <s>, <path>:<line>: <text>`. This is the
/// form an HTTP or other front-end adapter should parse; the richer
/// multi-line format above is for interactive use only.
fn print_adapter(results: &[SearchResult]) {
    for r in results {
        let line = r.first_match_line.unwrap_or(1);
        let text = r.snippets.first().cloned().unwrap_or_default();
        println!("score: {:.4}, {}:{}: {}", r.score, r.path.display(), line, text);
    }
}
