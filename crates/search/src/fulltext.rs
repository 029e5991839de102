//! BM25 lexical index
//!
//! Inverted index mapping term -> (document -> term frequency), plus
//! per-document lengths and corpus statistics. Reindexing an ID is
//! idempotent: prior postings are fully removed first. Terms with no
//! remaining postings are pruned from the index.
//!
//! Scoring uses the non-negative IDF variant `ln(1 + (N-df+0.5)/(df+0.5))`
//! rather than the classical Robertson-Sparck-Jones form, which can go
//! negative for very common terms.

use crate::tokenizer::{tokenize, tokenize_unique};
use parking_lot::RwLock;
use skald_core::{CancelToken, DocId, RankedHit, Result};
use std::collections::BTreeMap;
use std::ops::Bound;

/// BM25 term-frequency saturation
const K1: f64 = 1.2;
/// BM25 document-length normalization
const B: f64 = 0.75;
/// IDF multiplier for prefix-expansion matches, under-weighted so exact
/// matches dominate ties. Tunable; 0.80 preserved for compatibility.
pub const PREFIX_IDF_FACTOR: f64 = 0.80;

#[derive(Debug, Default)]
struct FulltextState {
    /// term -> (document -> term frequency). BTreeMap so prefix expansion
    /// is a range scan and iteration is deterministic.
    postings: BTreeMap<String, BTreeMap<DocId, usize>>,
    /// Raw stored text, used by phrase search
    documents: BTreeMap<DocId, String>,
    /// Per-document token count
    doc_lengths: BTreeMap<DocId, usize>,
    /// Corpus mean document length; recomputed after every mutation
    avg_doc_length: f64,
}

impl FulltextState {
    fn remove(&mut self, id: &DocId) -> bool {
        if self.documents.remove(id).is_none() {
            return false;
        }
        self.doc_lengths.remove(id);
        self.postings.retain(|_, docs| {
            docs.remove(id);
            !docs.is_empty()
        });
        self.recompute_avg_length();
        true
    }

    fn recompute_avg_length(&mut self) {
        let count = self.doc_lengths.len();
        self.avg_doc_length = if count == 0 {
            0.0
        } else {
            self.doc_lengths.values().sum::<usize>() as f64 / count as f64
        };
    }

    /// Non-negative IDF: ln(1 + (N - df + 0.5) / (df + 0.5))
    fn idf(&self, doc_freq: usize) -> f64 {
        let n = self.documents.len() as f64;
        let df = doc_freq as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln().max(0.0)
    }

    /// BM25 contribution of one term occurrence in one document
    fn bm25_term_score(&self, idf: f64, tf: usize, doc_len: usize) -> f64 {
        let tf = tf as f64;
        let length_norm = if self.avg_doc_length > 0.0 {
            1.0 - B + B * (doc_len as f64 / self.avg_doc_length)
        } else {
            1.0
        };
        idf * (tf * (K1 + 1.0)) / (tf + K1 * length_norm)
    }

    /// Accumulate scores for one posting list into the running totals
    fn accumulate(&self, docs: &BTreeMap<DocId, usize>, idf: f64, scores: &mut BTreeMap<DocId, f64>) {
        for (id, &tf) in docs {
            let doc_len = self.doc_lengths.get(id).copied().unwrap_or(0);
            *scores.entry(id.clone()).or_insert(0.0) += self.bm25_term_score(idf, tf, doc_len);
        }
    }
}

/// Lexical full-text index with BM25 ranking and prefix expansion
#[derive(Debug, Default)]
pub struct FulltextIndex {
    state: RwLock<FulltextState>,
}

impl FulltextIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index or reindex a document's text
    ///
    /// Reindex fully removes the prior postings first, so the operation is
    /// idempotent. Text that tokenizes to nothing still stores the raw text
    /// for phrase search and counts toward corpus statistics.
    pub fn index_document(&self, id: DocId, text: &str) {
        let tokens = tokenize(text);

        let mut state = self.state.write();
        state.remove(&id);

        for token in &tokens {
            *state
                .postings
                .entry(token.clone())
                .or_default()
                .entry(id.clone())
                .or_insert(0) += 1;
        }
        state.doc_lengths.insert(id.clone(), tokens.len());
        state.documents.insert(id, text.to_string());
        state.recompute_avg_length();
    }

    /// Remove a document. Returns whether it was present.
    pub fn remove_document(&self, id: &DocId) -> bool {
        self.state.write().remove(id)
    }

    /// BM25-ranked search over the corpus
    ///
    /// Each distinct query term contributes its exact-match BM25 score plus,
    /// for every indexed term having it as a strict prefix, the same formula
    /// at [`PREFIX_IDF_FACTOR`] of the IDF.
    pub fn search(&self, cancel: &CancelToken, query: &str, limit: usize) -> Result<Vec<RankedHit>> {
        cancel.checkpoint()?;
        let terms = tokenize_unique(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state.read();
        let mut scores: BTreeMap<DocId, f64> = BTreeMap::new();

        for term in &terms {
            if let Some(docs) = state.postings.get(term) {
                let idf = state.idf(docs.len());
                state.accumulate(docs, idf, &mut scores);
            }

            // Prefix expansion: range scan over indexed terms strictly
            // extending this query term
            for (indexed_term, docs) in state
                .postings
                .range::<String, _>((Bound::Excluded(term.clone()), Bound::Unbounded))
            {
                if !indexed_term.starts_with(term.as_str()) {
                    break;
                }
                let idf = state.idf(docs.len()) * PREFIX_IDF_FACTOR;
                state.accumulate(docs, idf, &mut scores);
            }
        }
        drop(state);

        let mut hits: Vec<RankedHit> = scores
            .into_iter()
            .map(|(id, score)| RankedHit { id, score })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Case-insensitive substring phrase search over raw stored text
    ///
    /// Scored by `1/(1 + offset/100)` so earlier occurrences rank higher.
    /// A simple contains-scan; not used by the hybrid path.
    pub fn phrase_search(&self, phrase: &str, limit: usize) -> Vec<RankedHit> {
        let phrase = phrase.to_lowercase();
        if phrase.is_empty() {
            return Vec::new();
        }

        let state = self.state.read();
        let mut hits: Vec<RankedHit> = state
            .documents
            .iter()
            .filter_map(|(id, text)| {
                text.to_lowercase().find(&phrase).map(|offset| RankedHit {
                    id: id.clone(),
                    score: 1.0 / (1.0 + offset as f64 / 100.0),
                })
            })
            .collect();
        drop(state);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        hits
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.state.read().documents.len()
    }

    /// Whether a document is indexed
    pub fn has_document(&self, id: &DocId) -> bool {
        self.state.read().documents.contains_key(id)
    }
}
