//! Hybrid search orchestrator
//!
//! Stateless per query: reads a shared-lock snapshot from the vector index,
//! then the lexical index, fuses with RRF, and degrades through a fallback
//! chain when fusion yields nothing:
//!
//! 1. RRF hybrid (vector + BM25), when an embedding is supplied
//! 2. Vector-only, when fusion returns no results
//! 3. Full-text only, when vector search also returns nothing
//!
//! A query with no embedding goes straight to full-text search; that is the
//! designed path for text-only queries, not a fallback.

use crate::fulltext::FulltextIndex;
use crate::fuser::{adaptive_weights, fuse_rrf, FusedHit};
use crate::rerank::{CrossEncoder, RerankCandidate};
use skald_core::{
    CancelToken, DocId, Node, RankedHit, Result, SearchMetrics, SearchOptions, SearchResponse,
    SearchResult, StorageEngine, METHOD_FULLTEXT, METHOD_RRF_HYBRID, METHOD_VECTOR,
};
use skald_index::distance::cosine_similarity;
use skald_index::{IndexKind, VectorIndex};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Node properties whose string values feed the lexical index
pub const SEARCHABLE_PROPERTIES: &[&str] = &[
    "content",
    "text",
    "title",
    "name",
    "description",
    "path",
    "workerRole",
    "requirements",
];

/// Hybrid retrieval service over one vector index and one lexical index
///
/// Safe for concurrent searches; each index guards its own state, and the
/// orchestrator holds no lock of its own.
pub struct SearchService {
    storage: Arc<dyn StorageEngine>,
    vector_index: Box<dyn VectorIndex>,
    fulltext_index: FulltextIndex,
    cross_encoder: CrossEncoder,
}

impl SearchService {
    /// Create a service with the default (exact) vector index
    pub fn new(storage: Arc<dyn StorageEngine>, dimension: usize) -> Self {
        Self::with_index_kind(storage, dimension, IndexKind::default())
    }

    /// Create a service with an explicit vector index kind
    pub fn with_index_kind(
        storage: Arc<dyn StorageEngine>,
        dimension: usize,
        kind: IndexKind,
    ) -> Self {
        SearchService {
            storage,
            vector_index: kind.build(dimension),
            fulltext_index: FulltextIndex::new(),
            cross_encoder: CrossEncoder::disabled(),
        }
    }

    /// Configure the optional cross-encoder reranker
    pub fn set_cross_encoder(&mut self, cross_encoder: CrossEncoder) {
        self.cross_encoder = cross_encoder;
    }

    /// Add a node to both indexes
    ///
    /// The vector index gets the embedding if present; the lexical index
    /// gets the concatenated searchable properties if any are non-empty.
    pub fn index_node(&self, node: &Node) -> Result<()> {
        if let Some(embedding) = &node.embedding {
            if !embedding.is_empty() {
                self.vector_index.add(node.id.clone(), embedding)?;
            }
        }

        let text = extract_searchable_text(node);
        if !text.is_empty() {
            self.fulltext_index.index_document(node.id.clone(), &text);
        }
        Ok(())
    }

    /// Remove a node from both indexes
    pub fn remove_node(&self, id: &DocId) {
        self.vector_index.remove(id);
        self.fulltext_index.remove_document(id);
    }

    /// Rebuild both indexes from the storage engine
    ///
    /// Nodes that fail to index are skipped, not fatal. Polls the
    /// cancellation token between nodes.
    pub fn build_indexes(&self, cancel: &CancelToken) -> Result<usize> {
        let mut indexed = 0usize;
        let mut skipped = 0usize;

        self.storage.for_each_node(&mut |node| {
            if cancel.is_cancelled() {
                return false;
            }
            match self.index_node(node) {
                Ok(()) => {
                    indexed += 1;
                    if indexed % 100 == 0 {
                        debug!(indexed, "index rebuild in progress");
                    }
                }
                Err(err) => {
                    skipped += 1;
                    warn!(id = %node.id, error = %err, "skipping node during index rebuild");
                }
            }
            true
        })?;
        cancel.checkpoint()?;

        info!(indexed, skipped, "index rebuild complete");
        Ok(indexed)
    }

    /// Number of vectors currently indexed
    pub fn vector_count(&self) -> usize {
        self.vector_index.count()
    }

    /// Number of documents currently in the lexical index
    pub fn document_count(&self) -> usize {
        self.fulltext_index.document_count()
    }

    /// Case-insensitive phrase containment search over stored text
    pub fn phrase_search(&self, phrase: &str, limit: usize) -> Vec<RankedHit> {
        self.fulltext_index.phrase_search(phrase, limit)
    }

    /// Hybrid search with automatic fallback
    ///
    /// With an embedding: try RRF fusion, fall back to vector-only, then to
    /// full-text, marking the response when a fallback fired. Without an
    /// embedding: full-text directly, unmarked.
    pub fn search(
        &self,
        cancel: &CancelToken,
        query: &str,
        embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        let embedding = embedding.filter(|e| !e.is_empty());

        let embedding = match embedding {
            Some(e) => e,
            None => {
                return self.fulltext_search_only(
                    cancel,
                    query,
                    opts,
                    false,
                    "Full-text BM25 search (no query embedding supplied)",
                );
            }
        };

        let response = self.rrf_hybrid_search(cancel, query, embedding, opts, start)?;
        if !response.results.is_empty() {
            return Ok(response);
        }

        debug!(query, "hybrid fusion empty, falling back to vector-only");
        let mut response = self.vector_search_only(cancel, query, embedding, opts)?;
        if !response.results.is_empty() {
            response.fallback_triggered = true;
            response.message =
                "RRF search returned no results, fell back to vector search".to_string();
            return Ok(response);
        }

        debug!(query, "vector-only empty, falling back to full-text");
        self.fulltext_search_only(
            cancel,
            query,
            opts,
            true,
            "Full-text BM25 search (vector search unavailable or returned no results)",
        )
    }

    /// Reciprocal Rank Fusion over both indexes
    fn rrf_hybrid_search(
        &self,
        cancel: &CancelToken,
        query: &str,
        embedding: &[f32],
        opts: &SearchOptions,
        start: Instant,
    ) -> Result<SearchResponse> {
        // Over-fetch so fusion has enough overlap to work with
        let candidate_limit = opts.limit * 2;
        let (vector_weight, lexical_weight) = if opts.adaptive_weights {
            adaptive_weights(query)
        } else {
            (opts.vector_weight, opts.lexical_weight)
        };

        let vector_start = Instant::now();
        let mut vector_hits =
            self.vector_index
                .search(cancel, embedding, candidate_limit, opts.min_similarity)?;
        let vector_time_ms = vector_start.elapsed().as_millis() as u64;

        let lexical_start = Instant::now();
        let mut lexical_hits = self.fulltext_index.search(cancel, query, candidate_limit)?;
        let lexical_time_ms = lexical_start.elapsed().as_millis() as u64;

        if !opts.types.is_empty() {
            vector_hits = self.filter_by_type(vector_hits, &opts.types);
            lexical_hits = self.filter_by_type(lexical_hits, &opts.types);
        }

        let fusion_start = Instant::now();
        let mut fused = fuse_rrf(
            &vector_hits,
            &lexical_hits,
            vector_weight,
            lexical_weight,
            opts.rrf_k,
            opts.min_rrf_score,
        );
        let fusion_time_ms = fusion_start.elapsed().as_millis() as u64;

        let mut search_method = METHOD_RRF_HYBRID.to_string();
        let mut message = "Reciprocal Rank Fusion (Vector + BM25)".to_string();

        if opts.mmr_enabled {
            fused = self.apply_mmr(fused, opts.limit, opts.mmr_lambda);
            search_method.push_str("+mmr");
            message = format!("RRF + MMR diversification (lambda={:.2})", opts.mmr_lambda);
        }

        if opts.rerank_enabled && self.cross_encoder.is_active() {
            fused = self.apply_rerank(query, fused, opts);
            search_method.push_str("+rerank");
            message.push_str(" + cross-encoder reranking");
        }

        let results = self.enrich_fused(&fused, opts.limit);

        Ok(SearchResponse {
            status: "success".to_string(),
            query: query.to_string(),
            total_candidates: fused.len(),
            returned: results.len(),
            results,
            search_method,
            fallback_triggered: false,
            message,
            metrics: Some(SearchMetrics {
                vector_time_ms,
                lexical_time_ms,
                fusion_time_ms,
                total_time_ms: start.elapsed().as_millis() as u64,
                vector_candidates: vector_hits.len(),
                lexical_candidates: lexical_hits.len(),
                fused_candidates: fused.len(),
            }),
        })
    }

    fn vector_search_only(
        &self,
        cancel: &CancelToken,
        query: &str,
        embedding: &[f32],
        opts: &SearchOptions,
    ) -> Result<SearchResponse> {
        let mut hits =
            self.vector_index
                .search(cancel, embedding, opts.limit * 2, opts.min_similarity)?;
        if !opts.types.is_empty() {
            hits = self.filter_by_type(hits, &opts.types);
        }

        let results = self.enrich_hits(&hits, opts.limit);
        Ok(SearchResponse {
            status: "success".to_string(),
            query: query.to_string(),
            total_candidates: hits.len(),
            returned: results.len(),
            results,
            search_method: METHOD_VECTOR.to_string(),
            fallback_triggered: false,
            message: "Vector similarity search (cosine)".to_string(),
            metrics: None,
        })
    }

    fn fulltext_search_only(
        &self,
        cancel: &CancelToken,
        query: &str,
        opts: &SearchOptions,
        fallback_triggered: bool,
        message: &str,
    ) -> Result<SearchResponse> {
        let mut hits = self.fulltext_index.search(cancel, query, opts.limit * 2)?;
        if !opts.types.is_empty() {
            hits = self.filter_by_type(hits, &opts.types);
        }

        let results = self.enrich_hits(&hits, opts.limit);
        Ok(SearchResponse {
            status: "success".to_string(),
            query: query.to_string(),
            total_candidates: hits.len(),
            returned: results.len(),
            results,
            search_method: METHOD_FULLTEXT.to_string(),
            fallback_triggered,
            message: message.to_string(),
            metrics: None,
        })
    }

    /// Keep only hits whose node carries one of the requested labels or a
    /// matching `type` property, compared case-insensitively
    fn filter_by_type(&self, hits: Vec<RankedHit>, types: &[String]) -> Vec<RankedHit> {
        let wanted: Vec<String> = types.iter().map(|t| t.to_lowercase()).collect();

        hits.into_iter()
            .filter(|hit| {
                let node = match self.storage.get_node(&hit.id) {
                    Ok(Some(node)) => node,
                    Ok(None) => return false,
                    Err(err) => {
                        warn!(id = %hit.id, error = %err, "type filter lookup failed");
                        return false;
                    }
                };

                node.labels
                    .iter()
                    .any(|label| wanted.contains(&label.to_lowercase()))
                    || node
                        .property_str("type")
                        .map(|t| wanted.contains(&t.to_lowercase()))
                        .unwrap_or(false)
            })
            .collect()
    }

    /// Maximal Marginal Relevance diversification
    ///
    /// Greedy selection: `mmr = lambda * relevance - (1 - lambda) * maxSim`
    /// where relevance is the fused score and maxSim is the best cosine
    /// similarity to anything already selected. Candidates without a stored
    /// embedding compete on relevance alone.
    fn apply_mmr(&self, fused: Vec<FusedHit>, limit: usize, lambda: f64) -> Vec<FusedHit> {
        if fused.len() <= 1 || lambda >= 1.0 {
            return fused;
        }

        let embeddings: Vec<Option<Vec<f32>>> = fused
            .iter()
            .map(|hit| {
                self.storage
                    .get_node(&hit.id)
                    .ok()
                    .flatten()
                    .and_then(|node| node.embedding)
            })
            .collect();

        let mut remaining: Vec<usize> = (0..fused.len()).collect();
        let mut selected: Vec<usize> = Vec::new();

        while selected.len() < limit && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_mmr = f64::NEG_INFINITY;

            for (pos, &candidate) in remaining.iter().enumerate() {
                let relevance = fused[candidate].rrf_score;

                let mut max_sim = 0.0f64;
                if let Some(candidate_embedding) = &embeddings[candidate] {
                    for &chosen in &selected {
                        if let Some(chosen_embedding) = &embeddings[chosen] {
                            let sim =
                                cosine_similarity(candidate_embedding, chosen_embedding) as f64;
                            if sim > max_sim {
                                max_sim = sim;
                            }
                        }
                    }
                }

                let mmr = lambda * relevance - (1.0 - lambda) * max_sim;
                if mmr > best_mmr {
                    best_mmr = mmr;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        selected.into_iter().map(|i| fused[i].clone()).collect()
    }

    /// Cross-encoder pass over the fused candidates. Any failure keeps the
    /// fused order.
    fn apply_rerank(&self, query: &str, fused: Vec<FusedHit>, opts: &SearchOptions) -> Vec<FusedHit> {
        if fused.is_empty() {
            return fused;
        }

        let mut candidates = Vec::with_capacity(fused.len());
        for hit in fused.iter().take(opts.rerank_top_k) {
            let node = match self.storage.get_node(&hit.id) {
                Ok(Some(node)) => node,
                _ => continue,
            };
            let content = extract_searchable_text(&node);
            if content.is_empty() {
                continue;
            }
            candidates.push(RerankCandidate {
                id: hit.id.clone(),
                content,
                score: hit.rrf_score,
            });
        }
        if candidates.is_empty() {
            return fused;
        }

        let reranked = self.cross_encoder.rerank(query, candidates);

        reranked
            .into_iter()
            .filter(|r| r.cross_score >= opts.rerank_min_score)
            .filter_map(|r| {
                fused.iter().find(|hit| hit.id == r.id).map(|original| FusedHit {
                    id: r.id.clone(),
                    rrf_score: r.cross_score,
                    vector_rank: original.vector_rank,
                    lexical_rank: original.lexical_rank,
                    original_score: r.bi_score,
                })
            })
            .collect()
    }

    fn enrich_fused(&self, fused: &[FusedHit], limit: usize) -> Vec<SearchResult> {
        fused
            .iter()
            .take(limit)
            .filter_map(|hit| {
                self.make_result(
                    &hit.id,
                    hit.rrf_score,
                    hit.original_score,
                    hit.vector_rank,
                    hit.lexical_rank,
                )
            })
            .collect()
    }

    fn enrich_hits(&self, hits: &[RankedHit], limit: usize) -> Vec<SearchResult> {
        hits.iter()
            .take(limit)
            .filter_map(|hit| self.make_result(&hit.id, hit.score, hit.score, None, None))
            .collect()
    }

    /// Resolve one hit against storage. Hits whose node vanished since
    /// indexing are dropped rather than returned half-empty.
    fn make_result(
        &self,
        id: &DocId,
        score: f64,
        similarity: f64,
        vector_rank: Option<usize>,
        lexical_rank: Option<usize>,
    ) -> Option<SearchResult> {
        let node = match self.storage.get_node(id) {
            Ok(Some(node)) => node,
            Ok(None) => return None,
            Err(err) => {
                warn!(id = %id, error = %err, "result enrichment lookup failed");
                return None;
            }
        };

        let content_preview = node
            .property_str("content")
            .or_else(|| node.property_str("text"))
            .map(|text| truncate_chars(text, 200))
            .unwrap_or_default();

        Some(SearchResult {
            id: id.clone(),
            node_type: node.property_str("type").unwrap_or_default().to_string(),
            title: node.property_str("title").unwrap_or_default().to_string(),
            description: node
                .property_str("description")
                .unwrap_or_default()
                .to_string(),
            content_preview,
            labels: node.labels,
            score,
            similarity,
            vector_rank,
            lexical_rank,
        })
    }
}

/// Concatenate the searchable string properties of a node
pub fn extract_searchable_text(node: &Node) -> String {
    let mut parts = Vec::new();
    for property in SEARCHABLE_PROPERTIES {
        if let Some(value) = node.property_str(property) {
            if !value.is_empty() {
                parts.push(value);
            }
        }
    }
    parts.join(" ")
}

/// Truncate to `max` characters, marking the cut with an ellipsis
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max).collect();
        format!("{truncated}...")
    }
}
