//! Engine-level error taxonomy.
//!
//! The memory engine reports failures through [`MemoryError`]; transport
//! adapters map each kind onto an HTTP status or tool-protocol error payload.
//! Judge failures never appear here — the linker absorbs them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Input failed a precondition (empty, whitespace-only, over-length).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The embedding service was unreachable or timed out.
    #[error("embedding service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The event store failed at the I/O level.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    /// An unexpected fault (poisoned lock, invariant breach).
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemoryError {
    /// Stable machine-readable code for transport payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
