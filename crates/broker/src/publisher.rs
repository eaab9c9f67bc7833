//! Best-effort event publishing.

use std::sync::Arc;

use common::EventEnvelope;

use crate::bus::EventBus;

/// Publishes domain events after committed mutations.
///
/// Publishing is strictly best-effort: the authoritative store is the
/// source of truth and the event stream only drives downstream
/// freshness. A failed publish is logged and dropped; it never fails or
/// rolls back the triggering mutation.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    /// Creates a publisher over the given bus.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Builds an envelope stamped with the current time and publishes it
    /// under `event_type` as the routing key.
    pub async fn publish(&self, event_type: &str, data: serde_json::Value) {
        self.publish_envelope(EventEnvelope::new(event_type, data))
            .await;
    }

    /// Publishes a pre-built envelope.
    pub async fn publish_envelope(&self, envelope: EventEnvelope) {
        match self.bus.publish(&envelope).await {
            Ok(()) => {
                metrics::counter!("events_published").increment(1);
                tracing::debug!(event_type = %envelope.event_type, "published event");
            }
            Err(error) => {
                metrics::counter!("events_publish_dropped").increment(1);
                tracing::warn!(
                    event_type = %envelope.event_type,
                    %error,
                    "failed to publish event, dropping"
                );
            }
        }
    }
}
