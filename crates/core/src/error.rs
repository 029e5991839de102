//! Error types for the search subsystem
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations. Note what is NOT an error: a retrieval strategy
//! producing zero results degrades through the fallback chain and is
//! reported as a status flag, never as an `Err`.

use crate::types::DocId;
use thiserror::Error;

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the search subsystem
#[derive(Debug, Error)]
pub enum Error {
    /// Vector length differs from the index's configured dimensionality.
    /// Always a hard error at add or query time; vectors are never silently
    /// truncated or padded.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the index was configured with
        expected: usize,
        /// Length of the vector that was supplied
        actual: usize,
    },

    /// Lookup by an ID that is not present. Drives insert-vs-update
    /// branching internally; not normally surfaced to query callers.
    #[error("document not found: {0}")]
    NotFound(DocId),

    /// A caller-supplied cancellation token fired during a long scan.
    #[error("operation cancelled")]
    Cancelled,

    /// Failure surfaced by the storage collaborator.
    #[error("storage error: {0}")]
    Storage(String),
}
