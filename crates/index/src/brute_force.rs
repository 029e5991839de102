//! Exact vector index: brute-force cosine scan
//!
//! Stores unit-normalized vectors in a BTreeMap and answers queries by
//! scoring every stored vector. O(n·D) per query, exact recall, no tuning
//! knobs. The scan polls the cancellation token between candidates so a
//! caller can abort a long query.

use crate::backend::VectorIndex;
use crate::distance::{dot_product, normalize};
use parking_lot::RwLock;
use skald_core::{CancelToken, DocId, Error, RankedHit, Result};
use std::collections::BTreeMap;

/// Brute-force cosine-similarity index
#[derive(Debug)]
pub struct ExactVectorIndex {
    dimension: usize,
    /// BTreeMap for deterministic scan order
    vectors: RwLock<BTreeMap<DocId, Vec<f32>>>,
}

impl ExactVectorIndex {
    /// Create an empty index for vectors of length `dimension`
    pub fn new(dimension: usize) -> Self {
        ExactVectorIndex {
            dimension,
            vectors: RwLock::new(BTreeMap::new()),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for ExactVectorIndex {
    fn add(&self, id: DocId, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        self.vectors.write().insert(id, normalize(vector));
        Ok(())
    }

    fn remove(&self, id: &DocId) -> bool {
        self.vectors.write().remove(id).is_some()
    }

    fn search(
        &self,
        cancel: &CancelToken,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedHit>> {
        self.check_dimension(query)?;
        let query = normalize(query);

        let vectors = self.vectors.read();
        let mut hits = Vec::new();
        for (id, stored) in vectors.iter() {
            cancel.checkpoint()?;
            let score = dot_product(&query, stored) as f64;
            if score >= min_similarity {
                hits.push(RankedHit {
                    id: id.clone(),
                    score,
                });
            }
        }
        drop(vectors);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn count(&self) -> usize {
        self.vectors.read().len()
    }

    fn has_vector(&self, id: &DocId) -> bool {
        self.vectors.read().contains_key(id)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
