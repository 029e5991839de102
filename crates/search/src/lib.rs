//! Hybrid retrieval for skald
//!
//! Combines two independent retrieval strategies over one corpus:
//! - Vector similarity (exact or HNSW, from `skald-index`)
//! - Lexical BM25 over an inverted index (this crate)
//!
//! and fuses their rankings with Reciprocal Rank Fusion. The entry point is
//! [`SearchService`]; feed it nodes with [`SearchService::index_node`] and
//! query with [`SearchService::search`].
//!
//! ```
//! use skald_core::{CancelToken, MemoryEngine, Node, SearchOptions};
//! use skald_search::SearchService;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryEngine::new());
//! let node = Node::new("doc-1")
//!     .with_property("content", "embedded graph database")
//!     .with_embedding(vec![1.0, 0.0, 0.0, 0.0]);
//! storage.put_node(node.clone());
//!
//! let service = SearchService::new(storage, 4);
//! service.index_node(&node).unwrap();
//!
//! let response = service
//!     .search(
//!         &CancelToken::new(),
//!         "graph database",
//!         Some(&[1.0, 0.0, 0.0, 0.0]),
//!         &SearchOptions::default(),
//!     )
//!     .unwrap();
//! assert_eq!(response.results[0].id.as_str(), "doc-1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fulltext;
pub mod fuser;
pub mod hybrid;
pub mod rerank;
pub mod tokenizer;

pub use fulltext::{FulltextIndex, PREFIX_IDF_FACTOR};
pub use fuser::{adaptive_weights, fuse_rrf, FusedHit};
pub use hybrid::{extract_searchable_text, SearchService, SEARCHABLE_PROPERTIES};
pub use rerank::{
    CrossEncoder, CrossEncoderConfig, RerankCandidate, RerankRequest, RerankResponse,
    RerankResult, RerankTransport,
};
pub use tokenizer::{tokenize, tokenize_unique};
