//! The contract shared by the exact and approximate vector indexes

use crate::brute_force::ExactVectorIndex;
use crate::hnsw::{HnswConfig, HnswIndex};
use skald_core::{CancelToken, DocId, RankedHit, Result};

/// Top-K cosine-similarity index over unit-normalized vectors
///
/// All methods take `&self`; implementations guard their internal state with
/// a reader-writer lock so searches run concurrently while mutations wait.
///
/// # Contract
///
/// - `add` rejects vectors whose length differs from the configured
///   dimensionality and replaces any existing vector under the same ID
/// - `search` returns up to `k` hits with similarity >= `min_similarity`,
///   sorted by (score desc, id asc); an empty index yields an empty list,
///   not an error
/// - `remove` is a no-op on absent IDs
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector stored under `id`
    fn add(&self, id: DocId, vector: &[f32]) -> Result<()>;

    /// Remove the vector stored under `id`. Returns whether it was present.
    fn remove(&self, id: &DocId) -> bool;

    /// Top-K query. `cancel` is polled during scans.
    fn search(
        &self,
        cancel: &CancelToken,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedHit>>;

    /// Number of stored vectors
    fn count(&self) -> usize;

    /// Whether a vector is stored under `id`
    fn has_vector(&self, id: &DocId) -> bool;

    /// Configured dimensionality
    fn dimension(&self) -> usize;
}

/// Which vector index implementation to build
///
/// The orchestrator never names a concrete index type; the choice is made
/// here, once, at construction time.
#[derive(Debug, Clone)]
pub enum IndexKind {
    /// Brute-force scan with exact recall
    Exact,
    /// HNSW graph with approximate recall
    Hnsw(HnswConfig),
}

impl Default for IndexKind {
    fn default() -> Self {
        IndexKind::Exact
    }
}

impl IndexKind {
    /// Build an index of this kind for vectors of length `dimension`
    pub fn build(&self, dimension: usize) -> Box<dyn VectorIndex> {
        match self {
            IndexKind::Exact => Box::new(ExactVectorIndex::new(dimension)),
            IndexKind::Hnsw(config) => Box::new(HnswIndex::new(dimension, config.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_both_kinds() {
        let exact = IndexKind::Exact.build(4);
        let hnsw = IndexKind::Hnsw(HnswConfig::default()).build(4);

        for index in [&exact, &hnsw] {
            assert_eq!(index.dimension(), 4);
            assert_eq!(index.count(), 0);
        }
    }

    #[test]
    fn test_both_kinds_honor_the_contract() {
        let cancel = CancelToken::new();
        for kind in [IndexKind::Exact, IndexKind::Hnsw(HnswConfig::default())] {
            let index = kind.build(3);
            index.add(DocId::from("a"), &[1.0, 0.0, 0.0]).unwrap();
            index.add(DocId::from("b"), &[0.0, 1.0, 0.0]).unwrap();

            assert_eq!(index.count(), 2);
            assert!(index.has_vector(&DocId::from("a")));
            assert!(!index.has_vector(&DocId::from("c")));

            let hits = index.search(&cancel, &[1.0, 0.0, 0.0], 5, 0.5).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id.as_str(), "a");

            assert!(index.remove(&DocId::from("a")));
            assert!(!index.remove(&DocId::from("a")));
            assert_eq!(index.count(), 1);
        }
    }
}
