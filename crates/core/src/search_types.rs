//! Request and response types shared by the indexes and the orchestrator
//!
//! - `RankedHit`: (document, score) pair emitted by each index
//! - `SearchOptions`: per-query knobs with sensible defaults
//! - `SearchResult` / `SearchResponse`: the externally visible result
//! - `SearchMetrics`: optional timing and candidate-count instrumentation

use crate::types::DocId;
use serde::Serialize;

/// Strategy label: hybrid Reciprocal Rank Fusion over both indexes
pub const METHOD_RRF_HYBRID: &str = "rrf_hybrid";
/// Strategy label: vector similarity only
pub const METHOD_VECTOR: &str = "vector";
/// Strategy label: lexical BM25 only
pub const METHOD_FULLTEXT: &str = "fulltext";

// ============================================================================
// RankedHit
// ============================================================================

/// A single ranked result from one index
///
/// Scores are strategy-local: cosine similarity in [-1, 1] from the vector
/// indexes, unbounded BM25 mass from the lexical index. The fusion layer is
/// rank-based precisely because these are not comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    /// Matching document
    pub id: DocId,
    /// Strategy-local score, higher = more relevant
    pub score: f64,
}

impl RankedHit {
    /// Create a new hit
    pub fn new(id: impl Into<DocId>, score: f64) -> Self {
        RankedHit {
            id: id.into(),
            score,
        }
    }
}

// ============================================================================
// SearchOptions
// ============================================================================

/// Per-query configuration for the fusion orchestrator
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results to return (default 50)
    pub limit: usize,
    /// Minimum similarity threshold for vector search (default 0.5)
    pub min_similarity: f64,
    /// Restrict results to nodes carrying one of these labels or `type`
    /// properties (empty = no filter)
    pub types: Vec<String>,
    /// RRF rank-smoothing constant (default 60)
    pub rrf_k: f64,
    /// Weight applied to the vector ranking (default 1.0)
    pub vector_weight: f64,
    /// Weight applied to the lexical ranking (default 1.0)
    pub lexical_weight: f64,
    /// Fused results below this score are discarded (default 0.01)
    pub min_rrf_score: f64,
    /// Derive the two weights from query word count instead of using the
    /// explicit values above (default true)
    pub adaptive_weights: bool,
    /// Re-rank fused results for diversity with MMR (default false)
    pub mmr_enabled: bool,
    /// MMR balance: 1.0 = pure relevance, 0.0 = pure diversity (default 0.7)
    pub mmr_lambda: f64,
    /// Re-score top candidates through the cross-encoder (default false)
    pub rerank_enabled: bool,
    /// How many fused candidates to hand to the cross-encoder (default 100)
    pub rerank_top_k: usize,
    /// Minimum cross-encoder score to keep a reranked result (default 0.0)
    pub rerank_min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            limit: 50,
            min_similarity: 0.5,
            types: Vec::new(),
            rrf_k: 60.0,
            vector_weight: 1.0,
            lexical_weight: 1.0,
            min_rrf_score: 0.01,
            adaptive_weights: true,
            mmr_enabled: false,
            mmr_lambda: 0.7,
            rerank_enabled: false,
            rerank_top_k: 100,
            rerank_min_score: 0.0,
        }
    }
}

impl SearchOptions {
    /// Builder: set the result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Builder: set the vector similarity floor
    pub fn with_min_similarity(mut self, min: f64) -> Self {
        self.min_similarity = min;
        self
    }

    /// Builder: restrict results to the given types/labels
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Builder: set explicit fusion weights, disabling adaptive weighting
    pub fn with_weights(mut self, vector: f64, lexical: f64) -> Self {
        self.vector_weight = vector;
        self.lexical_weight = lexical;
        self.adaptive_weights = false;
        self
    }
}

// ============================================================================
// SearchResult / SearchMetrics / SearchResponse
// ============================================================================

/// One enriched result as returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Document ID
    pub id: DocId,
    /// Node labels from storage
    pub labels: Vec<String>,
    /// `type` property from storage, if present
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub node_type: String,
    /// `title` property, if present
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// `description` property, if present
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// `content`/`text` property truncated to 200 characters
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_preview: String,
    /// Primary ranking score (fused score on the hybrid path)
    pub score: f64,
    /// Best-available strategy-local score (cosine similarity when the
    /// document came through the vector index)
    pub similarity: f64,
    /// Position in the vector ranking, 1-indexed, if the document appeared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_rank: Option<usize>,
    /// Position in the lexical ranking, 1-indexed, if the document appeared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_rank: Option<usize>,
}

/// Timing and candidate-count instrumentation for one query
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchMetrics {
    /// Wall time of the vector index call, in milliseconds
    pub vector_time_ms: u64,
    /// Wall time of the lexical index call, in milliseconds
    pub lexical_time_ms: u64,
    /// Wall time of rank fusion, in milliseconds
    pub fusion_time_ms: u64,
    /// Total wall time of the query, in milliseconds
    pub total_time_ms: u64,
    /// Candidates returned by the vector index
    pub vector_candidates: usize,
    /// Candidates returned by the lexical index
    pub lexical_candidates: usize,
    /// Candidates surviving fusion
    pub fused_candidates: usize,
}

/// Response from one search operation
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Always `"success"`; degraded strategies are flagged, not failed
    pub status: String,
    /// Echo of the query text
    pub query: String,
    /// Ordered, enriched results
    pub results: Vec<SearchResult>,
    /// Candidates considered before truncation to `limit`
    pub total_candidates: usize,
    /// Number of results returned
    pub returned: usize,
    /// Strategy actually used (`rrf_hybrid` | `vector` | `fulltext`, with
    /// `+mmr` / `+rerank` suffixes when those stages ran)
    pub search_method: String,
    /// Whether a degraded strategy was used because the preferred one
    /// produced nothing
    pub fallback_triggered: bool,
    /// Human-readable explanation of the strategy choice
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Optional instrumentation (populated on the hybrid path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SearchMetrics>,
}
