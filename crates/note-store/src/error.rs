use common::NoteId;
use thiserror::Error;

/// Errors that can occur when interacting with the note store.
#[derive(Debug, Error)]
pub enum NoteStoreError {
    /// The note was not found in the store.
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for note store operations.
pub type Result<T> = std::result::Result<T, NoteStoreError>;
