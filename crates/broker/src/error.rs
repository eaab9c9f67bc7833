use thiserror::Error;

/// Errors that can occur on the broker path.
#[derive(Debug, Error)]
pub enum BusError {
    /// No broker session is currently established.
    #[error("Broker session not established")]
    NotConnected,

    /// An AMQP protocol or transport error occurred.
    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BusError>;
