//! Cooperative cancellation for scan-style operations
//!
//! Brute-force vector search and bulk index rebuild poll a token between
//! candidate evaluations and abort early with `Error::Cancelled` instead of
//! silently truncating. Bounded algorithms (HNSW beam search, BM25 scoring)
//! accept a token for signature symmetry but complete deterministically.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap clonable cancellation token
///
/// All clones observe the same flag. `cancel()` is sticky: once set, every
/// subsequent `checkpoint()` fails.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation on this token and all of its clones
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Poll point for long scans: `Err(Cancelled)` once the token fired
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
