//! Broker-facing layer: session lifecycle, publishing, and consumption.
//!
//! The transport is split from the handling logic through the [`EventBus`]
//! trait, which hands out deliveries as (payload, ack-handle) pairs. Two
//! implementations share that seam: [`AmqpBus`] over a lapin session and
//! [`InMemoryBus`] for tests.

pub mod amqp;
pub mod bus;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod session;
pub mod topic;

pub use amqp::AmqpBus;
pub use bus::{AckHandle, Delivery, EventBus, SubscribeOptions, Subscription};
pub use common::EventEnvelope;
pub use consumer::{EventConsumer, EventHandler, HandlerError};
pub use error::{BusError, Result};
pub use memory::InMemoryBus;
pub use publisher::EventPublisher;
pub use session::{BrokerConfig, BrokerSession, SessionState};
pub use topic::topic_matches;
