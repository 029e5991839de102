//! skald: hybrid retrieval core for an embedded graph database
//!
//! Given a textual query and/or a dense embedding, skald returns a ranked
//! set of matching nodes drawn from two independent retrieval strategies,
//! vector cosine similarity (exact brute-force or approximate HNSW) and
//! lexical BM25, fused into one ranking with Reciprocal Rank Fusion and
//! degraded gracefully when either strategy comes up empty.
//!
//! The indexes are a derived, rebuildable projection of a storage engine;
//! they are never the system of record.
//!
//! # Quick start
//!
//! ```
//! use skald::{CancelToken, MemoryEngine, Node, SearchOptions, SearchService};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryEngine::new());
//! let node = Node::new("doc-1")
//!     .with_label("Document")
//!     .with_property("title", "Hybrid search")
//!     .with_property("content", "vector similarity fused with BM25")
//!     .with_embedding(vec![1.0, 0.0, 0.0, 0.0]);
//! storage.put_node(node.clone());
//!
//! let service = SearchService::new(storage, 4);
//! service.index_node(&node).unwrap();
//!
//! let response = service
//!     .search(
//!         &CancelToken::new(),
//!         "hybrid search",
//!         Some(&[1.0, 0.0, 0.0, 0.0]),
//!         &SearchOptions::default(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(response.search_method, "rrf_hybrid");
//! assert_eq!(response.results[0].id.as_str(), "doc-1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use skald_core::{
    CancelToken, DocId, Error, MemoryEngine, Node, RankedHit, Result, SearchMetrics,
    SearchOptions, SearchResponse, SearchResult, StorageEngine, METHOD_FULLTEXT,
    METHOD_RRF_HYBRID, METHOD_VECTOR,
};
pub use skald_index::{ExactVectorIndex, HnswConfig, HnswIndex, IndexKind, VectorIndex};
pub use skald_search::{
    CrossEncoder, CrossEncoderConfig, FulltextIndex, RerankTransport, SearchService,
};

/// Vector index primitives (exact and HNSW) and shared vector math
pub mod index {
    pub use skald_index::*;
}

/// Tokenizer, BM25 index, RRF fuser, orchestrator, and rerank boundary
pub mod search {
    pub use skald_search::*;
}
