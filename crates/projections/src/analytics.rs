//! Analytics cache projector.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use broker::{EventEnvelope, EventHandler, HandlerError};
use chrono::{DateTime, Utc};
use domain::NoteEvent;
use note_store::NoteStore;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;

/// Immutable aggregate view over the note store.
///
/// Replaced wholesale on every refresh; readers hold an `Arc` clone and
/// can never observe a torn snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_notes: u64,
    pub counts_by_category: HashMap<String, u64>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// The empty snapshot visible between process start and the first
    /// successful refresh.
    pub fn empty() -> Self {
        Self {
            total_notes: 0,
            counts_by_category: HashMap::new(),
            last_refreshed_at: DateTime::UNIX_EPOCH,
        }
    }
}

/// Event-driven cache projector.
///
/// Rather than applying event payloads incrementally, every consumed
/// event triggers a full re-aggregation against the authoritative store.
/// The snapshot is a pure function of current store state, so applying
/// the same event twice, or two events in swapped order, converges on
/// the same result. At-least-once, unordered delivery requires exactly
/// that of the handler.
pub struct AnalyticsProjector<S> {
    store: S,
    current: RwLock<Arc<AnalyticsSnapshot>>,
}

impl<S: NoteStore> AnalyticsProjector<S> {
    /// Creates a projector with an empty snapshot.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: RwLock::new(Arc::new(AnalyticsSnapshot::empty())),
        }
    }

    /// Re-derives the snapshot from the store and swaps it in.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<AnalyticsSnapshot>> {
        let counts = self.store.aggregate_counts().await?;

        let snapshot = Arc::new(AnalyticsSnapshot {
            total_notes: counts.total,
            counts_by_category: counts.by_category,
            last_refreshed_at: Utc::now(),
        });

        *self.current.write().await = snapshot.clone();
        metrics::counter!("analytics_cache_refreshes").increment(1);
        tracing::debug!(total_notes = snapshot.total_notes, "analytics cache refreshed");

        Ok(snapshot)
    }

    /// Returns the latest swapped-in snapshot. Never blocks on a live
    /// refresh.
    pub async fn snapshot(&self) -> Arc<AnalyticsSnapshot> {
        self.current.read().await.clone()
    }
}

#[async_trait]
impl<S: NoteStore> EventHandler for AnalyticsProjector<S> {
    async fn handle(&self, envelope: &EventEnvelope) -> std::result::Result<(), HandlerError> {
        match NoteEvent::from_envelope(envelope) {
            Ok(Some(event)) => {
                tracing::debug!(event_type = event.routing_key(), "consumed note event");
            }
            Ok(None) => {
                // Forward compatibility: new event types are acked, not errors.
                tracing::debug!(event_type = %envelope.event_type, "ignoring unknown event type");
                return Ok(());
            }
            Err(error) => {
                // The refresh below derives from the store, not the payload,
                // so a payload we cannot decode still drives a refresh.
                tracing::warn!(event_type = %envelope.event_type, %error, "undecodable event payload");
            }
        }

        self.refresh().await?;
        Ok(())
    }
}
