//! In-memory event bus for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::EventEnvelope;
use tokio::sync::{Mutex, mpsc};

use crate::bus::{AckHandle, Delivery, EventBus, SubscribeOptions, Subscription};
use crate::topic::topic_matches;
use crate::{BusError, Result};

const QUEUE_CAPACITY: usize = 64;

/// In-memory bus with the same delivery semantics as the AMQP bus:
/// topic-pattern routing, one queue per subscriber, redelivery on nack.
///
/// A connectivity toggle simulates broker outages, so the
/// disconnected-publish and reconnect scenarios are testable without a
/// broker process.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    queues: Arc<Mutex<HashMap<String, QueueHandle>>>,
    connected: Arc<AtomicBool>,
}

#[derive(Clone)]
struct QueueHandle {
    binding: String,
    tx: mpsc::Sender<Delivery>,
}

impl InMemoryBus {
    /// Creates a bus in the connected state.
    pub fn new() -> Self {
        let bus = Self::default();
        bus.connected.store(true, Ordering::SeqCst);
        bus
    }

    /// Creates a bus simulating a down broker.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Toggles simulated broker connectivity.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }

        let payload = serde_json::to_vec(envelope)?;
        let queues = self.queues.lock().await;
        for (name, queue) in queues.iter() {
            if !topic_matches(&queue.binding, &envelope.event_type) {
                continue;
            }
            let delivery = Delivery {
                payload: payload.clone(),
                ack: Box::new(MemoryAckHandle {
                    payload: payload.clone(),
                    tx: queue.tx.clone(),
                }),
            };
            if queue.tx.try_send(delivery).is_err() {
                tracing::warn!(queue = %name, "in-memory queue full, dropping delivery");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        self.queues.lock().await.insert(
            options.queue.clone(),
            QueueHandle {
                binding: options.binding.clone(),
                tx,
            },
        );
        Ok(Subscription::new(rx))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

struct MemoryAckHandle {
    payload: Vec<u8>,
    tx: mpsc::Sender<Delivery>,
}

#[async_trait]
impl AckHandle for MemoryAckHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        // Requeue: hand the payload back with a fresh handle.
        let redelivery = Delivery {
            payload: self.payload.clone(),
            ack: Box::new(MemoryAckHandle {
                payload: self.payload,
                tx: self.tx.clone(),
            }),
        };
        let _ = self.tx.send(redelivery).await;
        Ok(())
    }
}
