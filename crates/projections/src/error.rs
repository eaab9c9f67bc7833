//! Projection error types.

use thiserror::Error;

/// Errors that can occur during cache projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The re-aggregation query against the authoritative store failed.
    /// Surfaced to the consumer so the event is redelivered instead of
    /// leaving a silently stale cache.
    #[error("Note store error: {0}")]
    Store(#[from] note_store::NoteStoreError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
