//! Pull-loop event consumption with ack/nack dispatch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::EventEnvelope;

use crate::bus::{Delivery, EventBus, SubscribeOptions};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Error type surfaced by event handlers; an error triggers a negative
/// acknowledgment and later redelivery.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler invoked for each delivered envelope.
///
/// Delivery is at-least-once and unordered across routing keys, so
/// implementations must be idempotent under redelivery and reordering.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError>;
}

/// Long-running consumer: declares its durable queue, pulls deliveries
/// one at a time, and acknowledges only after the handler succeeds.
pub struct EventConsumer {
    bus: Arc<dyn EventBus>,
    options: SubscribeOptions,
}

impl EventConsumer {
    /// Creates a consumer over the given bus.
    pub fn new(bus: Arc<dyn EventBus>, options: SubscribeOptions) -> Self {
        Self { bus, options }
    }

    /// Runs the consume loop until the process exits. Resubscribes
    /// whenever the delivery stream ends (session loss); queue and
    /// binding declarations are idempotent.
    pub async fn run(self, handler: Arc<dyn EventHandler>) {
        loop {
            let mut subscription = match self.bus.subscribe(&self.options).await {
                Ok(subscription) => subscription,
                Err(error) => {
                    tracing::warn!(
                        queue = %self.options.queue,
                        %error,
                        "failed to subscribe, retrying"
                    );
                    tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                    continue;
                }
            };

            tracing::info!(
                queue = %self.options.queue,
                binding = %self.options.binding,
                prefetch = self.options.prefetch,
                "consuming events"
            );

            while let Some(delivery) = subscription.recv().await {
                Self::dispatch(delivery, handler.as_ref()).await;
            }

            tracing::warn!(queue = %self.options.queue, "delivery stream ended, resubscribing");
        }
    }

    /// Handles one delivery: deserialize, dispatch, ack or nack.
    async fn dispatch(delivery: Delivery, handler: &dyn EventHandler) {
        metrics::counter!("events_consumed").increment(1);

        let envelope: EventEnvelope = match serde_json::from_slice(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(error) => {
                // Redelivery cannot repair a malformed message.
                tracing::warn!(%error, "discarding malformed event");
                if let Err(error) = delivery.ack.ack().await {
                    tracing::warn!(%error, "failed to ack malformed event");
                }
                return;
            }
        };

        match handler.handle(&envelope).await {
            Ok(()) => {
                metrics::counter!("events_acked").increment(1);
                if let Err(error) = delivery.ack.ack().await {
                    tracing::warn!(event_type = %envelope.event_type, %error, "ack failed");
                }
            }
            Err(error) => {
                metrics::counter!("events_nacked").increment(1);
                tracing::warn!(
                    event_type = %envelope.event_type,
                    %error,
                    "handler failed, requeueing for redelivery"
                );
                if let Err(error) = delivery.ack.nack().await {
                    tracing::warn!(event_type = %envelope.event_type, %error, "nack failed");
                }
            }
        }
    }
}
