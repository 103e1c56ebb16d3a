use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::models::{DocId, InvertedIndex, Posting};
use crate::tokenizer::tokenize;

const MAX_SNIPPETS_PER_DOC: usize = 2;
const SNIPPET_CONTEXT_CHARS: usize = 40;
const FALLBACK_SNIPPET_CHARS: usize = 100;

/// Boolean combination of query terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    And,
    Or,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::And
    }
}

impl Mode {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "and" => Ok(Mode::And),
            "or" => Ok(Mode::Or),
            other => anyhow::bail!("unknown search mode '{other}', expected 'and' or 'or'"),
        }
    }
}

/// One ranked hit: the document, its score, the matched terms' positions,
/// and up to two rendered snippets.
pub struct SearchResult {
    pub doc_id: DocId,
    pub path: PathBuf,
    pub total_words: u64,
    pub score: f64,
    pub term_positions: HashMap<String, Vec<u32>>,
    pub snippets: Vec<String>,
    pub first_match_line: Option<usize>,
}

/// Tokenizes `query`, evaluates it against `index` under `mode`, scores
/// surviving candidates by TF-IDF, and returns them ranked by score
/// descending.
pub fn search(index: &InvertedIndex, query: &str, mode: Mode) -> Vec<SearchResult> {
    let query_terms = tokenize(query);
    if query_terms.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let unique_terms: Vec<String> = query_terms
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    let total_docs = index.docs.len() as f64;
    let idf: HashMap<String, f64> = unique_terms
        .iter()
        .map(|term| {
            let value = match index.index.get(term) {
                None => 0.0,
                Some(postings) => {
                    let df = postings.len() as f64;
                    (total_docs / df).ln()
                }
            };
            (term.clone(), value)
        })
        .collect();

    let candidates = match mode {
        Mode::Or => collect_or(index, &unique_terms),
        Mode::And => collect_and(index, &unique_terms),
    };

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|(doc_id, matches)| {
            let doc = index.docs.get(&doc_id)?;
            let mut score = 0.0;
            let mut term_positions = HashMap::new();
            for (term, posting) in &matches {
                score += posting.frequency as f64 * idf.get(term).copied().unwrap_or(0.0);
                term_positions.insert(term.clone(), posting.positions.clone());
            }
            let (snippets, first_match_line) = generate_snippets(&doc.path, &matches);
            Some(SearchResult {
                doc_id,
                path: doc.path.clone(),
                total_words: doc.total_words,
                score,
                term_positions,
                snippets,
                first_match_line,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

type CandidateMap = HashMap<DocId, HashMap<String, Posting>>;

fn collect_or(index: &InvertedIndex, terms: &[String]) -> CandidateMap {
    let mut candidates: CandidateMap = HashMap::new();
    for term in terms {
        let Some(postings) = index.index.get(term) else {
            continue;
        };
        for posting in postings {
            candidates
                .entry(posting.doc_id)
                .or_default()
                .insert(term.clone(), posting.clone());
        }
    }
    candidates
}

fn collect_and(index: &InvertedIndex, terms: &[String]) -> CandidateMap {
    if terms.iter().any(|t| !index.index.contains_key(t)) {
        return CandidateMap::new();
    }

    // The probe is the query term with the smallest postings list; seeding
    // from it keeps the intersection as small as possible as early as
    // possible.
    let probe = terms
        .iter()
        .min_by_key(|t| index.index[t.as_str()].len())
        .expect("terms is non-empty and every term is present in the index");

    let mut candidates: CandidateMap = HashMap::new();
    for posting in &index.index[probe.as_str()] {
        let mut matched = HashMap::new();
        matched.insert(probe.clone(), posting.clone());
        candidates.insert(posting.doc_id, matched);
    }

    for term in terms {
        if term == probe {
            continue;
        }
        let postings_by_doc: HashMap<DocId, &Posting> = index.index[term.as_str()]
            .iter()
            .map(|p| (p.doc_id, p))
            .collect();
        candidates.retain(|doc_id, _| postings_by_doc.contains_key(doc_id));
        if candidates.is_empty() {
            return candidates;
        }
        for (doc_id, matched) in candidates.iter_mut() {
            let posting = postings_by_doc[doc_id];
            matched.insert(term.clone(), posting.clone());
        }
    }

    candidates
}

/// Loads `path` and renders up to two snippets, one per matched term, each
/// bolding every occurrence of that term found within a 40-char window
/// around its first hit. Falls back to a leading excerpt when no per-term
/// snippet could be produced, and to a placeholder when the file can't be
/// read; neither case is fatal for the surrounding search.
fn generate_snippets(
    path: &Path,
    matches: &HashMap<String, Posting>,
) -> (Vec<String>, Option<usize>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            return (
                vec![format!(
                    "(snippet unavailable: failed to read {}: {err})",
                    path.display()
                )],
                None,
            );
        }
    };

    let mut terms: Vec<&String> = matches.keys().collect();
    terms.sort();

    let mut snippets = Vec::new();
    let mut first_match_line = None;
    for term in terms {
        if snippets.len() >= MAX_SNIPPETS_PER_DOC {
            break;
        }
        if let Some((snippet, line)) = snippet_for_term(&content, term) {
            snippets.push(snippet);
            first_match_line = Some(first_match_line.map_or(line, |l: usize| l.min(line)));
        }
    }

    if snippets.is_empty() {
        let trimmed = content.trim();
        let cut = trimmed
            .char_indices()
            .nth(FALLBACK_SNIPPET_CHARS)
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        snippets.push(format!("{}...", &trimmed[..cut]));
    }

    (snippets, first_match_line)
}

fn snippet_for_term(content: &str, term: &str) -> Option<(String, usize)> {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
    let re = Regex::new(&pattern).ok()?;
    let all_matches: Vec<_> = re.find_iter(content).collect();
    let first = all_matches.first()?;

    let line = content[..first.start()].bytes().filter(|&b| b == b'\n').count() + 1;

    let chars: Vec<char> = content.chars().collect();
    let start_char = content[..first.start()].chars().count();
    let end_char = start_char + content[first.start()..first.end()].chars().count();

    let ctx_start = start_char.saturating_sub(SNIPPET_CONTEXT_CHARS);
    let ctx_end = (end_char + SNIPPET_CONTEXT_CHARS).min(chars.len());
    let truncated_left = ctx_start > 0;
    let truncated_right = ctx_end < chars.len();

    let mut match_ranges = Vec::new();
    for m in &all_matches {
        let s = content[..m.start()].chars().count();
        let e = s + content[m.start()..m.end()].chars().count();
        if s >= ctx_start && e <= ctx_end {
            match_ranges.push((s, e));
        }
    }

    let mut snippet = String::new();
    if truncated_left {
        snippet.push_str("... ");
    }
    let mut cursor = ctx_start;
    for (s, e) in match_ranges {
        snippet.extend(&chars[cursor..s]);
        snippet.push_str("**");
        snippet.extend(&chars[s..e]);
        snippet.push_str("**");
        cursor = e;
    }
    snippet.extend(&chars[cursor..ctx_end]);
    if truncated_right {
        snippet.push_str(" ...");
    }

    Some((snippet, line))
}
