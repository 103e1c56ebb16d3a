use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a document the first time its path is seen.
pub type DocId = u64;

/// Normalized, lowercase, alphanumeric search term.
pub type Term = String;

/// One indexed file: its identity, path, and the bookkeeping needed for
/// incremental rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub path: PathBuf,
    pub total_words: u64,
    pub last_modified: SystemTime,
}

/// One (term, document) entry in a postings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocId, positions: Vec<u32>) -> Self {
        let frequency = positions.len() as u32;
        Self {
            doc_id,
            frequency,
            positions,
        }
    }
}

/// The full inverted index: term -> postings, doc id -> document, and the
/// next id to hand out.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub index: HashMap<Term, Vec<Posting>>,
    pub docs: HashMap<DocId, Document>,
    pub next_doc_id: DocId,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bincode never leaves a `HashMap` field null on decode, unlike a gob
    /// decoder handed a zero-value map; this is a no-op kept to document
    /// that guarantee at the load boundary.
    pub fn normalize(&mut self) {}

    /// Insert or overwrite the posting for `doc_id` under `term`. A document
    /// contributing zero positions is simply not indexed under that term.
    pub fn upsert_posting(&mut self, term: &str, doc_id: DocId, positions: Vec<u32>) {
        if positions.is_empty() {
            return;
        }
        let postings = self.index.entry(term.to_string()).or_default();
        match postings.iter_mut().find(|p| p.doc_id == doc_id) {
            Some(existing) => {
                existing.frequency = positions.len() as u32;
                existing.positions = positions;
            }
            None => postings.push(Posting::new(doc_id, positions)),
        }
    }

    /// Drop a document and every posting referencing it.
    pub fn remove_doc(&mut self, doc_id: DocId) {
        self.docs.remove(&doc_id);
        for postings in self.index.values_mut() {
            postings.retain(|p| p.doc_id != doc_id);
        }
        self.index.retain(|_, postings| !postings.is_empty());
    }
}
