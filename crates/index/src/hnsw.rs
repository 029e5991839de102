//! Approximate vector index: hierarchical navigable small-world graph
//!
//! Layered proximity graph over unit-normalized vectors. Inserts assign each
//! node an exponentially distributed level, greedily descend from the entry
//! point, then beam-search each layer for neighbor candidates and link
//! bidirectionally with pruning. Queries descend the same way and beam-search
//! layer 0.
//!
//! Determinism:
//! - Level assignment uses a fixed-seed SplitMix64 counter, never a global
//!   RNG, so identical insert sequences build identical graphs
//! - BTreeMap/BTreeSet keep node and neighbor iteration ordered
//! - Ties break on (score desc, id asc)
//!
//! Distance is `1 - dot(a, b)` over normalized vectors; internally we
//! compare raw dot products directly since the ordering is the same.

use crate::backend::VectorIndex;
use crate::distance::{dot_product, normalize};
use parking_lot::RwLock;
use skald_core::{CancelToken, DocId, Error, RankedHit, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Fixed seed for level assignment
const RNG_SEED: u64 = 42;

/// HNSW tuning parameters
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Max neighbors per node per layer (default 16)
    pub m: usize,
    /// Beam width while inserting (default 200)
    pub ef_construction: usize,
    /// Beam width while querying (default 100)
    pub ef_search: usize,
    /// Level multiplier, 1/ln(m)
    pub ml: f64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let m = 16;
        HnswConfig {
            m,
            ef_construction: 200,
            ef_search: 100,
            ml: 1.0 / (m as f64).ln(),
        }
    }
}

/// One graph node: its vector, assigned level, and per-layer neighbor sets
///
/// `neighbors.len() == level + 1`; each set holds at most M IDs.
#[derive(Debug)]
struct HnswNode {
    vector: Vec<f32>,
    level: usize,
    neighbors: Vec<BTreeSet<DocId>>,
}

/// Scored candidate (max-heap by score, tie-break by id asc)
#[derive(Debug, Clone, PartialEq)]
struct Scored {
    score: f32,
    id: DocId,
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap<Scored> pops highest score first (nearest candidate);
        // BinaryHeap<Reverse<Scored>> pops lowest score first (worst result)
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Debug, Default)]
struct HnswState {
    nodes: BTreeMap<DocId, HnswNode>,
    entry_point: Option<DocId>,
    max_level: usize,
    rng_counter: u64,
}

impl HnswState {
    /// Draw a level from floor(-ln(U) * ml) with a counter-seeded SplitMix64
    fn assign_level(&mut self, ml: f64) -> usize {
        self.rng_counter += 1;
        let hash = splitmix64(RNG_SEED.wrapping_add(self.rng_counter));
        let uniform = (hash as f64) / (u64::MAX as f64);
        // Clamp to avoid ln(0)
        let uniform = uniform.max(1e-15);
        (-uniform.ln() * ml) as usize
    }

    fn score_against(&self, query: &[f32], id: &DocId) -> Option<f32> {
        self.nodes
            .get(id)
            .map(|node| dot_product(query, &node.vector))
    }

    /// Single-best-neighbor hill-climb at one layer. Moves to a neighbor
    /// only if strictly closer to the query than the current node.
    fn greedy_step(&self, query: &[f32], start: DocId, layer: usize) -> DocId {
        let mut current = start;
        let mut current_score = match self.score_against(query, &current) {
            Some(s) => s,
            None => return current,
        };

        loop {
            let node = match self.nodes.get(&current) {
                Some(n) => n,
                None => break,
            };
            if layer >= node.neighbors.len() {
                break;
            }

            let mut improved = false;
            for neighbor_id in &node.neighbors[layer] {
                if let Some(score) = self.score_against(query, neighbor_id) {
                    if score > current_score {
                        current = neighbor_id.clone();
                        current_score = score;
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
        }
        current
    }

    /// Beam search at a single layer (SEARCH-LAYER from the HNSW paper)
    ///
    /// Returns up to `ef` closest nodes, sorted by (score desc, id asc).
    /// Candidates sit in a max-heap so the nearest is expanded first; the
    /// result set sits in a min-heap so the worst result is evicted in O(1).
    fn search_layer(&self, query: &[f32], entry: DocId, ef: usize, layer: usize) -> Vec<Scored> {
        let entry_score = match self.score_against(query, &entry) {
            Some(s) => s,
            None => return Vec::new(),
        };

        let mut visited = BTreeSet::new();
        visited.insert(entry.clone());

        let mut candidates = BinaryHeap::new();
        candidates.push(Scored {
            score: entry_score,
            id: entry.clone(),
        });

        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();
        results.push(Reverse(Scored {
            score: entry_score,
            id: entry,
        }));

        while let Some(nearest) = candidates.pop() {
            let worst_score = results
                .peek()
                .map(|r| r.0.score)
                .unwrap_or(f32::NEG_INFINITY);
            if nearest.score < worst_score && results.len() >= ef {
                break;
            }

            let node = match self.nodes.get(&nearest.id) {
                Some(n) => n,
                None => continue,
            };
            if layer >= node.neighbors.len() {
                continue;
            }

            for neighbor_id in &node.neighbors[layer] {
                if visited.contains(neighbor_id) {
                    continue;
                }
                visited.insert(neighbor_id.clone());

                // Neighbor lists may hold IDs removed since linking; skip them
                let score = match self.score_against(query, neighbor_id) {
                    Some(s) => s,
                    None => continue,
                };

                let worst_score = results
                    .peek()
                    .map(|r| r.0.score)
                    .unwrap_or(f32::NEG_INFINITY);
                if results.len() < ef || score > worst_score {
                    candidates.push(Scored {
                        score,
                        id: neighbor_id.clone(),
                    });
                    results.push(Reverse(Scored {
                        score,
                        id: neighbor_id.clone(),
                    }));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<Scored> = results.into_iter().map(|r| r.0).collect();
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    /// Remove a node, strip back-references from every node it listed, and
    /// re-elect the entry point if it was removed.
    fn remove(&mut self, id: &DocId) -> bool {
        let node = match self.nodes.remove(id) {
            Some(n) => n,
            None => return false,
        };

        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            for neighbor_id in neighbors {
                if let Some(neighbor) = self.nodes.get_mut(neighbor_id) {
                    if layer < neighbor.neighbors.len() {
                        neighbor.neighbors[layer].remove(id);
                    }
                }
            }
        }

        if self.entry_point.as_ref() == Some(id) {
            self.elect_entry_point();
        }
        true
    }

    /// Rescan all nodes for the new maximum-level entry point
    fn elect_entry_point(&mut self) {
        let best = self
            .nodes
            .iter()
            .max_by(|(a_id, a), (b_id, b)| a.level.cmp(&b.level).then_with(|| b_id.cmp(a_id)))
            .map(|(id, node)| (id.clone(), node.level));

        match best {
            Some((id, level)) => {
                self.entry_point = Some(id);
                self.max_level = level;
            }
            None => {
                self.entry_point = None;
                self.max_level = 0;
            }
        }
    }
}

/// SplitMix64 hash, used as a counter-based deterministic PRNG
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// HNSW approximate nearest-neighbor index
#[derive(Debug)]
pub struct HnswIndex {
    dimension: usize,
    config: HnswConfig,
    state: RwLock<HnswState>,
}

impl HnswIndex {
    /// Create an empty index for vectors of length `dimension`
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        HnswIndex {
            dimension,
            config,
            state: RwLock::new(HnswState::default()),
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

    /// Link `id` and `neighbor_id` at `layer`, pruning the neighbor's list
    /// back to the M closest when the back-reference overflows it.
    fn link(&self, state: &mut HnswState, id: &DocId, neighbor_id: &DocId, layer: usize) {
        if let Some(node) = state.nodes.get_mut(id) {
            if layer < node.neighbors.len() {
                node.neighbors[layer].insert(neighbor_id.clone());
            }
        }

        let overflow = {
            let neighbor = match state.nodes.get(neighbor_id) {
                Some(n) => n,
                None => return,
            };
            layer < neighbor.neighbors.len() && neighbor.neighbors[layer].len() >= self.config.m
        };

        if !overflow {
            if let Some(neighbor) = state.nodes.get_mut(neighbor_id) {
                if layer < neighbor.neighbors.len() {
                    neighbor.neighbors[layer].insert(id.clone());
                }
            }
            return;
        }

        // Recompute the neighbor set as the M closest among old members plus
        // the new node, not a simple truncation
        let kept: BTreeSet<DocId> = {
            let neighbor = match state.nodes.get(neighbor_id) {
                Some(n) => n,
                None => return,
            };
            let mut scored: Vec<Scored> = neighbor.neighbors[layer]
                .iter()
                .chain(std::iter::once(id))
                .filter_map(|candidate| {
                    state.score_against(&neighbor.vector, candidate).map(|s| Scored {
                        score: s,
                        id: candidate.clone(),
                    })
                })
                .collect();
            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
            scored.truncate(self.config.m);
            scored.into_iter().map(|s| s.id).collect()
        };

        if let Some(neighbor) = state.nodes.get_mut(neighbor_id) {
            neighbor.neighbors[layer] = kept;
        }
    }
}

impl VectorIndex for HnswIndex {
    fn add(&self, id: DocId, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        let vector = normalize(vector);

        let mut state = self.state.write();

        // Reindex of an existing ID is remove-then-insert
        state.remove(&id);

        let level = state.assign_level(self.config.ml);

        if state.entry_point.is_none() {
            state.nodes.insert(
                id.clone(),
                HnswNode {
                    vector,
                    level,
                    neighbors: vec![BTreeSet::new(); level + 1],
                },
            );
            state.entry_point = Some(id);
            state.max_level = level;
            return Ok(());
        }

        let entry_level = state.max_level;
        let mut current = state
            .entry_point
            .clone()
            .unwrap_or_else(|| id.clone());

        // Hill-climb down to one layer above the new node's level
        for layer in ((level + 1)..=entry_level).rev() {
            current = state.greedy_step(&vector, current, layer);
        }

        state.nodes.insert(
            id.clone(),
            HnswNode {
                vector: vector.clone(),
                level,
                neighbors: vec![BTreeSet::new(); level + 1],
            },
        );

        // Beam-search each shared layer and link to the M closest
        for layer in (0..=level.min(entry_level)).rev() {
            let found = state.search_layer(&vector, current.clone(), self.config.ef_construction, layer);
            if let Some(best) = found.first() {
                current = best.id.clone();
            }
            for candidate in found.iter().take(self.config.m) {
                if candidate.id == id {
                    continue;
                }
                self.link(&mut state, &id, &candidate.id, layer);
            }
        }

        if level > state.max_level {
            state.max_level = level;
            state.entry_point = Some(id);
        }
        Ok(())
    }

    fn remove(&self, id: &DocId) -> bool {
        self.state.write().remove(id)
    }

    fn search(
        &self,
        cancel: &CancelToken,
        query: &[f32],
        k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedHit>> {
        self.check_dimension(query)?;
        // Beam search is bounded by ef, so the token is only polled once
        cancel.checkpoint()?;

        let state = self.state.read();
        let mut current = match state.entry_point.clone() {
            Some(entry) => entry,
            None => return Ok(Vec::new()),
        };
        let query = normalize(query);

        for layer in (1..=state.max_level).rev() {
            current = state.greedy_step(&query, current, layer);
        }

        let ef = self.config.ef_search.max(k);
        let candidates = state.search_layer(&query, current, ef, 0);

        Ok(candidates
            .into_iter()
            .map(|c| RankedHit {
                id: c.id,
                score: c.score as f64,
            })
            .filter(|hit| hit.score >= min_similarity)
            .take(k)
            .collect())
    }

    fn count(&self) -> usize {
        self.state.read().nodes.len()
    }

    fn has_vector(&self, id: &DocId) -> bool {
        self.state.read().nodes.contains_key(id)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i % dim] = 1.0;
        v
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = HnswIndex::new(4, HnswConfig::default());
        let hits = index
            .search(&CancelToken::new(), &[1.0, 0.0, 0.0, 0.0], 5, 0.0)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_single_node() {
        let index = HnswIndex::new(2, HnswConfig::default());
        index.add(DocId::from("a"), &[1.0, 0.0]).unwrap();

        let hits = index
            .search(&CancelToken::new(), &[1.0, 0.0], 5, 0.5)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "a");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = HnswIndex::new(3, HnswConfig::default());
        assert!(matches!(
            index.add(DocId::from("a"), &[1.0]).unwrap_err(),
            Error::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert!(matches!(
            index
                .search(&CancelToken::new(), &[1.0], 1, 0.0)
                .unwrap_err(),
            Error::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_finds_nearest_among_many() {
        let index = HnswIndex::new(8, HnswConfig::default());
        for i in 0..50 {
            let mut v = axis(8, i);
            // Spread points around axes with a small per-point offset
            v[(i + 1) % 8] = 0.1 + (i as f32) * 0.001;
            index.add(DocId::from(format!("d{i}")), &v).unwrap();
        }
        let target = vec![0.0, 0.0, 0.0, 1.0, 0.1, 0.0, 0.0, 0.0];
        index.add(DocId::from("target"), &target).unwrap();

        let hits = index.search(&CancelToken::new(), &target, 1, 0.5).unwrap();
        assert_eq!(hits[0].id.as_str(), "target");
        assert!((hits[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_min_similarity_filters() {
        let index = HnswIndex::new(2, HnswConfig::default());
        index.add(DocId::from("near"), &[1.0, 0.0]).unwrap();
        index.add(DocId::from("far"), &[0.0, 1.0]).unwrap();

        let hits = index
            .search(&CancelToken::new(), &[1.0, 0.0], 10, 0.5)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "near");
    }

    #[test]
    fn test_reindex_replaces_vector() {
        let index = HnswIndex::new(2, HnswConfig::default());
        index.add(DocId::from("a"), &[1.0, 0.0]).unwrap();
        index.add(DocId::from("a"), &[0.0, 1.0]).unwrap();
        assert_eq!(index.count(), 1);

        let hits = index
            .search(&CancelToken::new(), &[0.0, 1.0], 1, 0.9)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "a");
    }

    #[test]
    fn test_remove_strips_back_references() {
        let index = HnswIndex::new(2, HnswConfig::default());
        index.add(DocId::from("a"), &[1.0, 0.0]).unwrap();
        index.add(DocId::from("b"), &[0.9, 0.1]).unwrap();
        index.add(DocId::from("c"), &[0.8, 0.2]).unwrap();

        assert!(index.remove(&DocId::from("b")));

        let state = index.state.read();
        let removed = DocId::from("b");
        for node in state.nodes.values() {
            for layer in &node.neighbors {
                assert!(!layer.contains(&removed));
            }
        }
    }

    #[test]
    fn test_removing_entry_point_elects_replacement() {
        let index = HnswIndex::new(2, HnswConfig::default());
        for i in 0..20 {
            let v = vec![(i as f32).cos(), (i as f32).sin()];
            index.add(DocId::from(format!("d{i}")), &v).unwrap();
        }

        let entry = index.state.read().entry_point.clone().unwrap();
        assert!(index.remove(&entry));

        let state = index.state.read();
        let new_entry = state.entry_point.clone().unwrap();
        assert_ne!(new_entry, entry);
        // The elected entry is a remaining node with the maximum level
        let max_level = state.nodes.values().map(|n| n.level).max().unwrap();
        assert_eq!(state.nodes[&new_entry].level, max_level);
        assert_eq!(state.max_level, max_level);
    }

    #[test]
    fn test_removing_last_node_empties_entry_point() {
        let index = HnswIndex::new(2, HnswConfig::default());
        index.add(DocId::from("a"), &[1.0, 0.0]).unwrap();
        index.remove(&DocId::from("a"));

        let state = index.state.read();
        assert!(state.entry_point.is_none());
        assert_eq!(state.max_level, 0);
        assert!(state.nodes.is_empty());
        drop(state);

        let hits = index
            .search(&CancelToken::new(), &[1.0, 0.0], 5, 0.0)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_neighbor_lists_bounded_by_m() {
        let config = HnswConfig {
            m: 4,
            ef_construction: 32,
            ef_search: 16,
            ml: 1.0 / 4f64.ln(),
        };
        let index = HnswIndex::new(4, config);
        for i in 0..60 {
            let v = vec![
                (i as f32 * 0.37).cos(),
                (i as f32 * 0.37).sin(),
                (i as f32 * 0.11).cos(),
                (i as f32 * 0.11).sin(),
            ];
            index.add(DocId::from(format!("d{i}")), &v).unwrap();
        }

        let state = index.state.read();
        for node in state.nodes.values() {
            for layer in &node.neighbors {
                assert!(layer.len() <= 4, "neighbor list exceeded M");
            }
        }
    }

    #[test]
    fn test_level_assignment_is_deterministic() {
        let build = || {
            let index = HnswIndex::new(2, HnswConfig::default());
            for i in 0..30 {
                let v = vec![(i as f32).cos(), (i as f32).sin()];
                index.add(DocId::from(format!("d{i}")), &v).unwrap();
            }
            index
        };

        let a = build();
        let b = build();
        let state_a = a.state.read();
        let state_b = b.state.read();
        assert_eq!(state_a.entry_point, state_b.entry_point);
        for (id, node) in state_a.nodes.iter() {
            assert_eq!(node.level, state_b.nodes[id].level);
        }
    }

    #[test]
    fn test_results_sorted_descending() {
        let index = HnswIndex::new(4, HnswConfig::default());
        for i in 0..30 {
            let v = vec![
                1.0,
                (i as f32) * 0.05,
                (i as f32 * 0.3).sin(),
                (i as f32 * 0.3).cos(),
            ];
            index.add(DocId::from(format!("d{i}")), &v).unwrap();
        }

        let hits = index
            .search(&CancelToken::new(), &[1.0, 0.2, 0.0, 0.0], 30, -1.0)
            .unwrap();
        assert!(!hits.is_empty());
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
