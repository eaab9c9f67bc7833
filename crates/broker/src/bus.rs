//! Transport abstraction: the seam between the broker and the handlers.

use async_trait::async_trait;
use common::EventEnvelope;
use tokio::sync::mpsc;

use crate::Result;

/// Acknowledgment handle for a single delivery.
///
/// Exactly one of [`ack`](AckHandle::ack) or [`nack`](AckHandle::nack)
/// must be called per delivery; the handle is consumed either way.
#[async_trait]
pub trait AckHandle: Send {
    /// Acknowledges the delivery, removing it from the queue permanently.
    async fn ack(self: Box<Self>) -> Result<()>;

    /// Negatively acknowledges the delivery with requeue, causing the
    /// broker to redeliver it later.
    async fn nack(self: Box<Self>) -> Result<()>;
}

/// One message pulled from a queue.
pub struct Delivery {
    /// Raw message bytes; deserialized at the consumer boundary.
    pub payload: Vec<u8>,

    /// Acknowledgment handle for this delivery.
    pub ack: Box<dyn AckHandle>,
}

/// Queue declaration parameters for a consumer.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Durable queue name, one per consuming service.
    pub queue: String,

    /// Topic binding pattern. `note.#` covers the whole note namespace,
    /// including multi-word keys like `note.favorite.toggled`.
    pub binding: String,

    /// Upper bound on unacknowledged deliveries in flight.
    pub prefetch: u16,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            queue: "analytics".to_string(),
            binding: "note.#".to_string(),
            prefetch: 8,
        }
    }
}

/// An open subscription, delivering messages one at a time.
pub struct Subscription {
    receiver: mpsc::Receiver<Delivery>,
}

impl Subscription {
    /// Wraps a delivery channel receiver.
    pub fn new(receiver: mpsc::Receiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Waits for the next delivery. Returns `None` when the underlying
    /// session is gone and the consumer should resubscribe.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

/// Transport abstraction over the message broker.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes an envelope to the topic exchange under its event type
    /// as the routing key. Does not wait for broker acknowledgment.
    ///
    /// Fails with [`BusError::NotConnected`] while no session is
    /// established; callers on the mutation path must treat that as a
    /// logged no-op, never as a reason to fail the mutation.
    ///
    /// [`BusError::NotConnected`]: crate::BusError::NotConnected
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()>;

    /// Declares a durable queue bound to the topic exchange and starts
    /// consuming from it. Declaration is idempotent, so resubscribing
    /// after a reconnect re-creates the same topology.
    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription>;

    /// Whether a broker session is currently established.
    fn is_connected(&self) -> bool;
}
