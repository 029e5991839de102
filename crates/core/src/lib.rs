//! Core types for the skald hybrid retrieval subsystem
//!
//! This crate provides:
//! - Error taxonomy and `Result` alias
//! - Document/node identity types and the storage collaborator trait
//! - Search request/response types shared by every index and the orchestrator
//! - Cooperative cancellation token for scan-style operations
//!
//! The search indexes are a derived, rebuildable projection of the storage
//! engine, never the system of record. This crate owns the boundary types
//! between the two.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod memory;
pub mod search_types;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use memory::MemoryEngine;
pub use search_types::{
    RankedHit, SearchMetrics, SearchOptions, SearchResponse, SearchResult, METHOD_FULLTEXT,
    METHOD_RRF_HYBRID, METHOD_VECTOR,
};
pub use types::{DocId, Node, StorageEngine};
