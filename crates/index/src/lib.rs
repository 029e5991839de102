//! Vector index primitives for skald
//!
//! Two implementations of one contract:
//! - [`ExactVectorIndex`]: brute-force cosine scan, exact recall, O(n·D) per query
//! - [`HnswIndex`]: hierarchical navigable small-world graph, approximate
//!   recall, logarithmic-time queries
//!
//! Both store unit-normalized vectors so cosine similarity reduces to a dot
//! product. The orchestrator is written against [`VectorIndex`] and the
//! exact-vs-approximate choice is pure configuration via [`IndexKind`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod brute_force;
pub mod distance;
pub mod hnsw;

pub use backend::{IndexKind, VectorIndex};
pub use brute_force::ExactVectorIndex;
pub use hnsw::{HnswConfig, HnswIndex};
