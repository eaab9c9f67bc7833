//! Share-access projection: public tokens and view counters.

use common::NoteId;
use domain::{Note, NoteEvent, SharePayload, ViewPayload};
use note_store::{NoteStore, NoteStoreError};
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;

use broker::EventPublisher;

/// Errors on the share path.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The note does not exist.
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    /// The token is unknown or has been revoked. A client error, not a
    /// server fault.
    #[error("Unknown or revoked share token")]
    UnknownToken,

    /// The underlying store failed.
    #[error(transparent)]
    Store(NoteStoreError),
}

impl From<NoteStoreError> for ShareError {
    fn from(error: NoteStoreError) -> Self {
        match error {
            NoteStoreError::NotFound(id) => ShareError::NoteNotFound(id),
            other => ShareError::Store(other),
        }
    }
}

/// Result of issuing a share token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareGrant {
    pub note_id: NoteId,
    pub token: String,
    /// False when the note already had an active token.
    pub newly_issued: bool,
}

/// Share statistics for one note.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareStats {
    pub note_id: NoteId,
    pub title: String,
    pub is_shared: bool,
    pub view_count: i64,
    pub share_token: Option<String>,
}

/// Synchronous derived-state path for public note access.
///
/// Token lookup and view counting are plain store operations invoked
/// from the request path; they have no relation to the event-broker
/// path beyond announcing what happened after the fact.
pub struct ShareAccess<S> {
    store: S,
    publisher: EventPublisher,
}

impl<S: NoteStore> ShareAccess<S> {
    /// Creates the projection over a store and a best-effort publisher.
    pub fn new(store: S, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// 256 bits of randomness, hex-encoded: unguessable by construction.
    fn mint_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issues a share token for a note, idempotently: if an active token
    /// exists it is returned unchanged instead of minting a second one.
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, note_id: NoteId) -> Result<ShareGrant, ShareError> {
        let candidate = Self::mint_token();
        let token = self.store.claim_shared_token(note_id, &candidate).await?;
        let newly_issued = token == candidate;

        if newly_issued {
            metrics::counter!("share_links_issued").increment(1);
            self.announce(NoteEvent::Shared(SharePayload {
                note_id,
                token: token.clone(),
            }))
            .await;
        }

        Ok(ShareGrant {
            note_id,
            token,
            newly_issued,
        })
    }

    /// Revokes the note's share token, if any.
    #[tracing::instrument(skip(self))]
    pub async fn revoke(&self, note_id: NoteId) -> Result<(), ShareError> {
        self.store.clear_shared_token(note_id).await?;
        self.announce(NoteEvent::ShareRevoked { note_id }).await;
        Ok(())
    }

    /// Resolves a public token to its note, counting the view.
    ///
    /// The store increments and returns in a single atomic operation, so
    /// concurrent resolves of the same token never lose an increment.
    #[tracing::instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<Note, ShareError> {
        let note = self
            .store
            .resolve_shared(token)
            .await?
            .ok_or(ShareError::UnknownToken)?;

        metrics::counter!("shared_note_views").increment(1);
        self.announce(NoteEvent::Viewed(ViewPayload {
            note_id: note.id,
            token: token.to_string(),
        }))
        .await;

        Ok(note)
    }

    /// Share statistics for one note.
    pub async fn stats(&self, note_id: NoteId) -> Result<ShareStats, ShareError> {
        let note = self
            .store
            .get(note_id)
            .await?
            .ok_or(ShareError::NoteNotFound(note_id))?;

        Ok(ShareStats {
            note_id: note.id,
            title: note.title,
            is_shared: note.shared_token.is_some(),
            view_count: note.view_count,
            share_token: note.shared_token,
        })
    }

    /// All currently shared notes, most-viewed first.
    pub async fn list_shared(&self) -> Result<Vec<Note>, ShareError> {
        Ok(self.store.list_shared().await?)
    }

    async fn announce(&self, event: NoteEvent) {
        match event.to_envelope() {
            Ok(envelope) => self.publisher.publish_envelope(envelope).await,
            Err(error) => tracing::warn!(%error, "failed to encode share event"),
        }
    }
}
