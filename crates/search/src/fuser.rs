//! Reciprocal Rank Fusion
//!
//! RRF combines ranked lists without score normalization: each list votes
//! for a document with `weight / (k + rank)` using 1-indexed ranks, and a
//! document absent from a list simply contributes nothing for it. `k = 60`
//! per Cormack, Clarke & Buettcher (2009). A document near the top of both
//! lists beats one that tops only a single list.

use skald_core::{DocId, RankedHit};
use std::collections::BTreeMap;

/// One fused candidate. Query-scoped, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    /// Document ID
    pub id: DocId,
    /// Weighted RRF score
    pub rrf_score: f64,
    /// 1-indexed position in the vector ranking, if present
    pub vector_rank: Option<usize>,
    /// 1-indexed position in the lexical ranking, if present
    pub lexical_rank: Option<usize>,
    /// Best-available strategy-local score, vector preferred
    pub original_score: f64,
}

/// Derive fusion weights from query shape
///
/// Short queries (<= 2 words) are usually navigational keyword lookups, so
/// the lexical list gets the louder vote. Long queries (>= 6 words) are
/// descriptive, favoring semantic match. Returns (vector, lexical).
pub fn adaptive_weights(query: &str) -> (f64, f64) {
    let word_count = query.split_whitespace().count();
    if word_count <= 2 {
        (0.5, 1.5)
    } else if word_count >= 6 {
        (1.5, 0.5)
    } else {
        (1.0, 1.0)
    }
}

/// Fuse two ranked lists with weighted RRF
///
/// Fused hits below `min_rrf_score` are discarded. Output is sorted by
/// (rrf_score desc, id asc).
pub fn fuse_rrf(
    vector_hits: &[RankedHit],
    lexical_hits: &[RankedHit],
    vector_weight: f64,
    lexical_weight: f64,
    rrf_k: f64,
    min_rrf_score: f64,
) -> Vec<FusedHit> {
    // 1-indexed rank maps per the RRF formula
    let mut vector_ranks: BTreeMap<&DocId, (usize, f64)> = BTreeMap::new();
    for (i, hit) in vector_hits.iter().enumerate() {
        vector_ranks.entry(&hit.id).or_insert((i + 1, hit.score));
    }
    let mut lexical_ranks: BTreeMap<&DocId, (usize, f64)> = BTreeMap::new();
    for (i, hit) in lexical_hits.iter().enumerate() {
        lexical_ranks.entry(&hit.id).or_insert((i + 1, hit.score));
    }

    let mut all_ids: BTreeMap<&DocId, ()> = BTreeMap::new();
    for hit in vector_hits.iter().chain(lexical_hits.iter()) {
        all_ids.insert(&hit.id, ());
    }

    let mut fused = Vec::with_capacity(all_ids.len());
    for id in all_ids.into_keys() {
        let vector_entry = vector_ranks.get(id).copied();
        let lexical_entry = lexical_ranks.get(id).copied();

        let mut rrf_score = 0.0;
        if let Some((rank, _)) = vector_entry {
            rrf_score += vector_weight / (rrf_k + rank as f64);
        }
        if let Some((rank, _)) = lexical_entry {
            rrf_score += lexical_weight / (rrf_k + rank as f64);
        }
        if rrf_score < min_rrf_score {
            continue;
        }

        let original_score = vector_entry
            .or(lexical_entry)
            .map(|(_, score)| score)
            .unwrap_or(0.0);

        fused.push(FusedHit {
            id: id.clone(),
            rrf_score,
            vector_rank: vector_entry.map(|(rank, _)| rank),
            lexical_rank: lexical_entry.map(|(rank, _)| rank),
            original_score,
        });
    }

    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    fused
}
