use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::Context;
use indicatif::ProgressBar;

use crate::models::{DocId, Document, InvertedIndex};
use crate::tokenizer::tokenize;

/// Builds the updated index for `root_dir`, reusing everything in
/// `old_index` that is still valid. Unchanged files are carried over
/// without being re-tokenized; new and modified files are ingested by a
/// worker pool; files no longer on disk are dropped along with their
/// postings.
pub fn build_index(root_dir: &Path, old_index: &InvertedIndex) -> anyhow::Result<InvertedIndex> {
    let current = discover_files(root_dir)?;
    let old_by_path: HashMap<&Path, &Document> = old_index
        .docs
        .values()
        .map(|doc| (doc.path.as_path(), doc))
        .collect();

    let mut new_index = InvertedIndex::new();
    new_index.next_doc_id = old_index.next_doc_id;

    let mut jobs = Vec::new();
    for (path, modified) in current {
        match old_by_path.get(path.as_path()) {
            Some(doc) if doc.last_modified == modified => {
                new_index.docs.insert(doc.id, (*doc).clone());
                carry_over_postings(old_index, &mut new_index, doc.id);
            }
            Some(doc) => jobs.push(Job {
                path,
                modified,
                reuse_doc_id: Some(doc.id),
            }),
            None => jobs.push(Job {
                path,
                modified,
                reuse_doc_id: None,
            }),
        }
    }

    if jobs.is_empty() {
        return Ok(new_index);
    }

    ingest(jobs, new_index)
}

struct Job {
    path: PathBuf,
    modified: SystemTime,
    reuse_doc_id: Option<DocId>,
}

struct IngestResult {
    path: PathBuf,
    modified: SystemTime,
    reuse_doc_id: Option<DocId>,
    tokens: Vec<String>,
    total_words: u64,
}

enum WorkerOutcome {
    Done(IngestResult),
    Failed { path: PathBuf, error: String },
}

/// Runs `jobs` through a bounded-channel worker pool sized to hardware
/// parallelism, with a single collector thread serially merging results
/// into `new_index` as they arrive. Arrival order is non-deterministic, so
/// doc ids handed out to brand-new files depend on which worker finishes
/// first, never on filesystem walk order.
fn ingest(jobs: Vec<Job>, new_index: InvertedIndex) -> anyhow::Result<InvertedIndex> {
    let num_jobs = jobs.len();
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(num_jobs);

    let (job_tx, job_rx) = mpsc::sync_channel::<Job>(num_jobs);
    let (result_tx, result_rx) = mpsc::sync_channel::<WorkerOutcome>(num_jobs);
    for job in jobs {
        job_tx
            .send(job)
            .expect("job channel receiver dropped before dispatch completed");
    }
    drop(job_tx);

    let bar = ProgressBar::new(num_jobs as u64);
    let collector_bar = bar.clone();
    let collector = std::thread::spawn(move || {
        let mut idx = new_index;
        while let Ok(outcome) = result_rx.recv() {
            match outcome {
                WorkerOutcome::Done(result) => merge_result(&mut idx, result),
                WorkerOutcome::Failed { path, error } => {
                    eprintln!("WARN: skipping {path:?}: {error}");
                }
            }
            collector_bar.inc(1);
        }
        idx
    });

    let job_rx = Arc::new(Mutex::new(job_rx));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("build ingestion worker pool")?;

    pool.scope(|scope| {
        for _ in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let tx = result_tx.clone();
            scope.spawn(move |_| {
                loop {
                    let job = {
                        let rx = job_rx.lock().expect("job receiver mutex poisoned");
                        rx.recv()
                    };
                    let job = match job {
                        Ok(job) => job,
                        Err(_) => break,
                    };
                    let outcome = ingest_one(job);
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);
    });

    bar.finish_and_clear();
    Ok(collector
        .join()
        .expect("ingestion collector thread panicked"))
}

fn ingest_one(job: Job) -> WorkerOutcome {
    match fs::read_to_string(&job.path) {
        Ok(content) => {
            let tokens = tokenize(&content);
            let total_words = tokens.len() as u64;
            WorkerOutcome::Done(IngestResult {
                path: job.path,
                modified: job.modified,
                reuse_doc_id: job.reuse_doc_id,
                tokens,
                total_words,
            })
        }
        Err(err) => WorkerOutcome::Failed {
            path: job.path,
            error: err.to_string(),
        },
    }
}

fn merge_result(idx: &mut InvertedIndex, result: IngestResult) {
    let doc_id = match result.reuse_doc_id {
        Some(id) => id,
        None => {
            let id = idx.next_doc_id;
            idx.next_doc_id += 1;
            id
        }
    };

    idx.docs.insert(
        doc_id,
        Document {
            id: doc_id,
            path: result.path,
            total_words: result.total_words,
            last_modified: result.modified,
        },
    );

    let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
    for (i, token) in result.tokens.iter().enumerate() {
        positions.entry(token.clone()).or_default().push(i as u32);
    }
    for (term, positions) in positions {
        idx.upsert_posting(&term, doc_id, positions);
    }
}

fn carry_over_postings(old_index: &InvertedIndex, new_index: &mut InvertedIndex, doc_id: DocId) {
    for (term, postings) in &old_index.index {
        if let Some(posting) = postings.iter().find(|p| p.doc_id == doc_id) {
            new_index
                .index
                .entry(term.clone())
                .or_default()
                .push(posting.clone());
        }
    }
}

/// Recursively walks `root`, returning every regular file whose lowercased
/// name ends in `.txt` or `.md`, paired with its modification time. Errors
/// reading the root itself are fatal; errors on nested entries are logged
/// and skipped.
pub fn discover_files(root: &Path) -> anyhow::Result<Vec<(PathBuf, SystemTime)>> {
    let mut out = Vec::new();
    walk(root, &mut out).with_context(|| format!("walk root directory {root:?}"))?;
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, SystemTime)>) -> anyhow::Result<()> {
    let entries = fs::read_dir(dir)?;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("WARN: skipping an entry in {dir:?}: {err}");
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(err) => {
                eprintln!("WARN: skipping {path:?}: {err}");
                continue;
            }
        };

        if file_type.is_dir() {
            if let Err(err) = walk(&path, out) {
                eprintln!("WARN: skipping subdirectory {path:?}: {err}");
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Some(name) = path.file_name() else {
            continue;
        };
        let name = name.to_string_lossy().to_lowercase();
        if !(name.ends_with(".txt") || name.ends_with(".md")) {
            continue;
        }

        match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => out.push((path, modified)),
            Err(err) => eprintln!("WARN: skipping {path:?}: cannot read mtime: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn discovers_only_txt_and_md_files_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "hello");
        write(dir.path(), "b.MD", "world");
        write(dir.path(), "c.rs", "fn main() {}");
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub"), "d.txt", "nested");

        let mut found: Vec<String> = discover_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        found.sort();

        assert_eq!(found, vec!["a.txt", "b.MD", "d.txt"]);
    }

    #[test]
    fn builds_postings_with_correct_frequency_and_positions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "The quick brown fox");
        write(dir.path(), "b.md", "quick foxes are quick");

        let idx = build_index(dir.path(), &InvertedIndex::new()).unwrap();

        assert_eq!(idx.docs.len(), 2);
        let quick_postings = idx.index.get("quick").unwrap();
        assert_eq!(quick_postings.len(), 2);

        for doc in idx.docs.values() {
            if doc.path.ends_with("b.md") {
                assert_eq!(doc.total_words, 4);
                let posting = quick_postings.iter().find(|p| p.doc_id == doc.id).unwrap();
                assert_eq!(posting.frequency, 2);
                assert_eq!(posting.positions, vec![0, 3]);
            } else {
                assert_eq!(doc.total_words, 4);
                let posting = quick_postings.iter().find(|p| p.doc_id == doc.id).unwrap();
                assert_eq!(posting.frequency, 1);
                assert_eq!(posting.positions, vec![1]);
            }
        }
    }

    #[test]
    fn incremental_rebuild_with_no_changes_keeps_ids_and_next_doc_id() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "hello world");

        let first = build_index(dir.path(), &InvertedIndex::new()).unwrap();
        let second = build_index(dir.path(), &first).unwrap();

        assert_eq!(first.next_doc_id, second.next_doc_id);
        let mut first_pairs: Vec<_> = first
            .docs
            .values()
            .map(|d| (d.path.clone(), d.id))
            .collect();
        let mut second_pairs: Vec<_> = second
            .docs
            .values()
            .map(|d| (d.path.clone(), d.id))
            .collect();
        first_pairs.sort();
        second_pairs.sort();
        assert_eq!(first_pairs, second_pairs);
    }

    #[test]
    fn unchanged_file_is_not_retokenized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", "hello world");
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let mut old_index = InvertedIndex::new();
        old_index.docs.insert(
            0,
            Document {
                id: 0,
                path: path.clone(),
                total_words: 99,
                last_modified: modified,
            },
        );
        old_index.next_doc_id = 1;
        old_index
            .index
            .insert("sentinel".to_string(), vec![crate::models::Posting::new(0, vec![7])]);

        let rebuilt = build_index(dir.path(), &old_index).unwrap();

        let doc = rebuilt.docs.get(&0).unwrap();
        assert_eq!(doc.total_words, 99, "carried-over doc must not be re-tokenized");
        assert_eq!(
            rebuilt.index.get("sentinel").unwrap()[0].positions,
            vec![7],
            "stale postings for the unchanged doc must be preserved as-is"
        );
        assert!(
            rebuilt.index.get("hello").is_none(),
            "re-tokenizing would have indexed 'hello', which must not happen"
        );
    }

    #[test]
    fn deleted_file_removes_its_document_and_postings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.txt", "hello world");

        let first = build_index(dir.path(), &InvertedIndex::new()).unwrap();
        let deleted_id = first.docs.values().find(|d| d.path == path).unwrap().id;

        fs::remove_file(&path).unwrap();
        let second = build_index(dir.path(), &first).unwrap();

        assert!(second.docs.get(&deleted_id).is_none());
        for postings in second.index.values() {
            assert!(postings.iter().all(|p| p.doc_id != deleted_id));
        }
    }
}
