//! Note domain events.
//!
//! One variant per routing key. Events carry the full post-mutation record
//! (or the id, for deletions) so the stream is self-describing, but
//! consumers re-derive state from the authoritative store rather than
//! trusting a payload that may be stale by the time of redelivery.

use common::{EventEnvelope, NoteId};
use serde::{Deserialize, Serialize};

use crate::note::Note;

/// Payload for share lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub note_id: NoteId,
    pub token: String,
}

/// Payload for public view events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub note_id: NoteId,
    pub token: String,
}

/// Events emitted after a committed note mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NoteEvent {
    /// A note was created.
    Created(Note),

    /// A note's fields were replaced.
    Updated(Note),

    /// A note was deleted.
    Deleted { id: NoteId },

    /// The favorite flag was flipped.
    FavoriteToggled(Note),

    /// The pin flag was flipped.
    PinToggled(Note),

    /// A public share token was issued.
    Shared(SharePayload),

    /// A shared note was accessed publicly.
    Viewed(ViewPayload),

    /// The share token was revoked.
    ShareRevoked { note_id: NoteId },
}

impl NoteEvent {
    /// The dot-namespaced routing key for this event.
    pub fn routing_key(&self) -> &'static str {
        match self {
            NoteEvent::Created(_) => "note.created",
            NoteEvent::Updated(_) => "note.updated",
            NoteEvent::Deleted { .. } => "note.deleted",
            NoteEvent::FavoriteToggled(_) => "note.favorite.toggled",
            NoteEvent::PinToggled(_) => "note.pin.toggled",
            NoteEvent::Shared(_) => "note.shared",
            NoteEvent::Viewed(_) => "note.viewed",
            NoteEvent::ShareRevoked { .. } => "note.share.revoked",
        }
    }

    /// Serializes this event into its wire envelope.
    pub fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        let data = match self {
            NoteEvent::Created(note)
            | NoteEvent::Updated(note)
            | NoteEvent::FavoriteToggled(note)
            | NoteEvent::PinToggled(note) => serde_json::to_value(note)?,
            NoteEvent::Deleted { id } => serde_json::json!({ "id": id }),
            NoteEvent::Shared(payload) => serde_json::to_value(payload)?,
            NoteEvent::Viewed(payload) => serde_json::to_value(payload)?,
            NoteEvent::ShareRevoked { note_id } => serde_json::json!({ "noteId": note_id }),
        };
        Ok(EventEnvelope::new(self.routing_key(), data))
    }

    /// Decodes an envelope into a typed event.
    ///
    /// Returns `Ok(None)` for event types outside the known set, which
    /// consumers acknowledge without acting on; new producer-side event
    /// types must not require a consumer redeployment.
    pub fn from_envelope(
        envelope: &EventEnvelope,
    ) -> Result<Option<NoteEvent>, serde_json::Error> {
        let data = envelope.data.clone();
        let event = match envelope.event_type.as_str() {
            "note.created" => NoteEvent::Created(serde_json::from_value(data)?),
            "note.updated" => NoteEvent::Updated(serde_json::from_value(data)?),
            "note.deleted" => {
                let payload: DeletedPayload = serde_json::from_value(data)?;
                NoteEvent::Deleted { id: payload.id }
            }
            "note.favorite.toggled" => NoteEvent::FavoriteToggled(serde_json::from_value(data)?),
            "note.pin.toggled" => NoteEvent::PinToggled(serde_json::from_value(data)?),
            "note.shared" => NoteEvent::Shared(serde_json::from_value(data)?),
            "note.viewed" => NoteEvent::Viewed(serde_json::from_value(data)?),
            "note.share.revoked" => {
                let payload: RevokedPayload = serde_json::from_value(data)?;
                NoteEvent::ShareRevoked {
                    note_id: payload.note_id,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[derive(Deserialize)]
struct DeletedPayload {
    id: NoteId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokedPayload {
    note_id: NoteId,
}
