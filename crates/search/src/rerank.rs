//! Optional cross-encoder reranking boundary
//!
//! Stage 2 of two-stage retrieval: the fused top-K candidates can be
//! re-scored by an external cross-encoder service. The core never performs
//! network I/O; callers supply a [`RerankTransport`] that moves the request
//! and brings back a response in whichever shape the service speaks.
//!
//! Every transport failure is absorbed: the pre-rerank order is returned
//! unchanged rather than surfacing an error to the query caller.

use serde::{Deserialize, Serialize};
use skald_core::DocId;
use std::cmp::Ordering;
use tracing::warn;

/// Reranking service configuration
#[derive(Debug, Clone)]
pub struct CrossEncoderConfig {
    /// Whether reranking runs at all
    pub enabled: bool,
    /// Model name forwarded to the service
    pub model: String,
    /// How many candidates to rerank (default 100)
    pub top_k: usize,
    /// Minimum cross-encoder score to keep a result (default 0.0)
    pub min_score: f64,
}

impl Default for CrossEncoderConfig {
    fn default() -> Self {
        CrossEncoderConfig {
            enabled: false,
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            top_k: 100,
            min_score: 0.0,
        }
    }
}

/// Request forwarded to the reranking service
#[derive(Debug, Clone, Serialize)]
pub struct RerankRequest {
    /// Query text
    pub query: String,
    /// Candidate document texts, in candidate order
    pub documents: Vec<String>,
    /// Model name
    pub model: String,
    /// How many scores the service should return
    pub top_n: usize,
}

/// One `{index, relevance_score}` entry (Cohere shape)
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedRelevance {
    /// Position in the request's document list
    pub index: usize,
    /// Cross-encoder score
    pub relevance_score: f64,
}

/// One `{index, score}` entry (simple shape)
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedScore {
    /// Position in the request's document list
    pub index: usize,
    /// Cross-encoder score
    pub score: f64,
}

/// Reranking service response, tolerant of three shapes
///
/// A service answers with exactly one of the fields populated; the other
/// two deserialize to empty. [`RerankResponse::scores_for`] resolves
/// whichever is present into per-candidate scores.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RerankResponse {
    /// Cohere shape: ranked `{index, relevance_score}` pairs
    #[serde(default)]
    pub results: Vec<IndexedRelevance>,
    /// HuggingFace TEI shape: scores aligned to input order
    #[serde(default)]
    pub scores: Vec<f64>,
    /// Simple shape: `{index, score}` rankings
    #[serde(default)]
    pub rankings: Vec<IndexedScore>,
}

impl RerankResponse {
    /// Resolve the response into one score per candidate, or `None` when
    /// no recognized field is populated
    pub fn scores_for(&self, candidate_count: usize) -> Option<Vec<f64>> {
        if !self.results.is_empty() {
            let mut scores = vec![0.0; candidate_count];
            for entry in &self.results {
                if entry.index < candidate_count {
                    scores[entry.index] = entry.relevance_score;
                }
            }
            return Some(scores);
        }
        if !self.scores.is_empty() {
            let mut scores = vec![0.0; candidate_count];
            let n = self.scores.len().min(candidate_count);
            scores[..n].copy_from_slice(&self.scores[..n]);
            return Some(scores);
        }
        if !self.rankings.is_empty() {
            let mut scores = vec![0.0; candidate_count];
            for entry in &self.rankings {
                if entry.index < candidate_count {
                    scores[entry.index] = entry.score;
                }
            }
            return Some(scores);
        }
        None
    }
}

/// Moves a [`RerankRequest`] to the reranking service and back
///
/// Implementations own all I/O concerns (HTTP, timeouts, auth). The core
/// treats any `Err` as "service unavailable" and keeps the original order.
pub trait RerankTransport: Send + Sync {
    /// Execute one rerank round trip
    fn rerank(
        &self,
        request: &RerankRequest,
    ) -> std::result::Result<RerankResponse, Box<dyn std::error::Error + Send + Sync>>;
}

/// A document handed to the reranker
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    /// Document ID
    pub id: DocId,
    /// Text the cross-encoder scores against the query
    pub content: String,
    /// First-stage (bi-encoder/fused) score
    pub score: f64,
}

/// A reranked document
#[derive(Debug, Clone)]
pub struct RerankResult {
    /// Document ID
    pub id: DocId,
    /// 1-indexed position before reranking
    pub original_rank: usize,
    /// 1-indexed position after reranking
    pub new_rank: usize,
    /// First-stage score
    pub bi_score: f64,
    /// Cross-encoder score (equals `bi_score` on pass-through)
    pub cross_score: f64,
}

/// Cross-encoder reranker over a pluggable transport
pub struct CrossEncoder {
    config: CrossEncoderConfig,
    transport: Option<Box<dyn RerankTransport>>,
}

impl CrossEncoder {
    /// Create a reranker. With `transport = None` every call passes through.
    pub fn new(config: CrossEncoderConfig, transport: Option<Box<dyn RerankTransport>>) -> Self {
        CrossEncoder { config, transport }
    }

    /// Disabled reranker that always passes candidates through unchanged
    pub fn disabled() -> Self {
        Self::new(CrossEncoderConfig::default(), None)
    }

    /// Whether reranking would actually run
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.transport.is_some()
    }

    /// Rerank candidates against the query
    ///
    /// Pass-through (original order, original scores) when the reranker is
    /// disabled, has no transport, or the service fails or answers in an
    /// unrecognized shape.
    pub fn rerank(&self, query: &str, mut candidates: Vec<RerankCandidate>) -> Vec<RerankResult> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let transport = match (&self.transport, self.config.enabled) {
            (Some(t), true) => t,
            _ => return pass_through(&candidates),
        };

        let top_k = if self.config.top_k == 0 {
            100
        } else {
            self.config.top_k
        };
        candidates.truncate(top_k);

        let request = RerankRequest {
            query: query.to_string(),
            documents: candidates.iter().map(|c| c.content.clone()).collect(),
            model: self.config.model.clone(),
            top_n: candidates.len(),
        };

        let scores = match transport.rerank(&request) {
            Ok(response) => match response.scores_for(candidates.len()) {
                Some(scores) => scores,
                None => {
                    warn!("rerank response had no recognized score field, keeping original order");
                    return pass_through(&candidates);
                }
            },
            Err(err) => {
                warn!(error = %err, "rerank transport failed, keeping original order");
                return pass_through(&candidates);
            }
        };

        let mut results: Vec<RerankResult> = candidates
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(i, (candidate, cross_score))| RerankResult {
                id: candidate.id.clone(),
                original_rank: i + 1,
                new_rank: 0,
                bi_score: candidate.score,
                cross_score,
            })
            .collect();

        results.sort_by(|a, b| {
            b.cross_score
                .partial_cmp(&a.cross_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let min_score = self.config.min_score;
        results
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.new_rank = i + 1;
                r
            })
            .filter(|r| r.cross_score >= min_score)
            .collect()
    }
}

fn pass_through(candidates: &[RerankCandidate]) -> Vec<RerankResult> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| RerankResult {
            id: c.id.clone(),
            original_rank: i + 1,
            new_rank: i + 1,
            bi_score: c.score,
            cross_score: c.score,
        })
        .collect()
}
