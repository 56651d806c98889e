//! Storage error types.

use thiserror::Error;

/// Errors from queue store operations.
///
/// Callers treat these as best-effort failures: they are logged, never
/// propagated past the queue, and the in-memory queue stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Underlying I/O failure (database open, read, write, commit).
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Queue could not be serialized or deserialized.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}
