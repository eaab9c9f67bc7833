use std::collections::HashMap;

use async_trait::async_trait;
use common::NoteId;
use domain::{NewNote, Note, NoteFilter, NoteUpdate};
use serde::Serialize;

use crate::Result;

/// Aggregate counts backing the analytics cache snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    /// Total number of notes.
    pub total: u64,

    /// Note count per category.
    pub by_category: HashMap<String, u64>,
}

/// Live statistics computed directly against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub total: u64,
    pub work: u64,
    pub personal: u64,
    pub ideas: u64,
    pub favorites: u64,
    pub pinned: u64,
    pub overdue: u64,
}

/// Core trait for authoritative note storage.
///
/// All implementations must be thread-safe (Send + Sync). Mutating
/// operations on a missing note fail with [`NoteStoreError::NotFound`];
/// reads return `Ok(None)`.
///
/// [`NoteStoreError::NotFound`]: crate::NoteStoreError::NotFound
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Inserts a note and returns it with its assigned id and timestamps.
    async fn create(&self, note: NewNote) -> Result<Note>;

    /// Retrieves a note by id.
    async fn get(&self, id: NoteId) -> Result<Option<Note>>;

    /// Lists notes matching the filter, pinned-first then newest-first.
    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>>;

    /// Replaces a note's editable fields.
    async fn update(&self, id: NoteId, update: NoteUpdate) -> Result<Note>;

    /// Deletes a note, returning its last state.
    async fn delete(&self, id: NoteId) -> Result<Note>;

    /// Flips the favorite flag.
    async fn toggle_favorite(&self, id: NoteId) -> Result<Note>;

    /// Flips the pin flag.
    async fn toggle_pin(&self, id: NoteId) -> Result<Note>;

    /// Re-derives the aggregate counts (total + per-category) from the
    /// current store state.
    async fn aggregate_counts(&self) -> Result<CategoryCounts>;

    /// Computes live statistics over the current store state.
    async fn stats(&self) -> Result<NoteStats>;

    /// Claims a share token for a note, idempotently.
    ///
    /// If the note already has an active token the existing token is
    /// returned and `candidate` is discarded; otherwise `candidate`
    /// becomes the active token. The claim is atomic at the store level,
    /// so concurrent claims for the same note converge on one token.
    async fn claim_shared_token(&self, id: NoteId, candidate: &str) -> Result<String>;

    /// Clears the share token association, if any.
    async fn clear_shared_token(&self, id: NoteId) -> Result<()>;

    /// Looks up a note by share token and increments its view counter as
    /// one atomic operation. Returns `None` for unknown or revoked tokens.
    async fn resolve_shared(&self, token: &str) -> Result<Option<Note>>;

    /// Lists all currently shared notes, most-viewed first.
    async fn list_shared(&self) -> Result<Vec<Note>>;
}
