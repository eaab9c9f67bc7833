//! AMQP implementation of the event bus over the shared broker session.

use async_trait::async_trait;
use common::EventEnvelope;
use futures_util::StreamExt;
use lapin::BasicProperties;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use tokio::sync::mpsc;

use crate::bus::{AckHandle, Delivery, EventBus, SubscribeOptions, Subscription};
use crate::session::BrokerSession;
use crate::{BusError, Result};

/// Event bus backed by the AMQP topic exchange.
#[derive(Clone)]
pub struct AmqpBus {
    session: BrokerSession,
}

impl AmqpBus {
    /// Creates a bus over an existing session handle.
    pub fn new(session: BrokerSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl EventBus for AmqpBus {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<()> {
        let Some(channel) = self.session.channel().await else {
            return Err(BusError::NotConnected);
        };

        let payload = serde_json::to_vec(envelope)?;

        // Best-effort: route and return without awaiting the confirm.
        let _confirm = channel
            .basic_publish(
                self.session.exchange(),
                &envelope.event_type,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await?;

        Ok(())
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription> {
        self.session.wait_connected().await;
        let channel = self.session.channel().await.ok_or(BusError::NotConnected)?;

        // Declarations are idempotent; every resubscribe after a
        // reconnect re-creates the same topology.
        channel
            .queue_declare(
                &options.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                &options.queue,
                self.session.exchange(),
                &options.binding,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .basic_qos(options.prefetch, BasicQosOptions::default())
            .await?;

        let consumer_tag = format!("{}-consumer", options.queue);
        let mut consumer = channel
            .basic_consume(
                &options.queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let (tx, rx) = mpsc::channel(usize::from(options.prefetch.max(1)));
        let queue = options.queue.clone();
        tokio::spawn(async move {
            while let Some(result) = consumer.next().await {
                match result {
                    Ok(message) => {
                        let delivery = Delivery {
                            payload: message.data,
                            ack: Box::new(AmqpAckHandle {
                                acker: message.acker,
                            }),
                        };
                        if tx.send(delivery).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%queue, %error, "consumer stream error");
                        break;
                    }
                }
            }
            // Dropping the sender ends the subscription; the consumer
            // loop resubscribes against the next session.
        });

        Ok(Subscription::new(rx))
    }

    fn is_connected(&self) -> bool {
        self.session.is_connected()
    }
}

struct AmqpAckHandle {
    acker: Acker,
}

#[async_trait]
impl AckHandle for AmqpAckHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        self.acker
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}
