//! Broker session lifecycle management.

use std::sync::Arc;
use std::time::Duration;

use lapin::options::ExchangeDeclareOptions;
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::{RwLock, watch};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl SessionState {
    /// Operator-facing label, surfaced by the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broker connection configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// AMQP connection URL.
    pub url: String,

    /// Durable topic exchange all note events route through.
    pub exchange: String,

    /// Fixed delay between reconnect attempts.
    pub retry_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "amqp://127.0.0.1:5672".to_string(),
            exchange: "notes_events".to_string(),
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// Process-wide handle to the single broker session.
///
/// One clone runs [`run`](BrokerSession::run) as a background task; every
/// other clone borrows the session read-only. The state machine is
/// `Disconnected → Connecting → Connected`, falling back to
/// `Disconnected` on any connection error, and the retry loop never
/// gives up: the service self-heals after broker restarts without
/// operator intervention.
#[derive(Clone)]
pub struct BrokerSession {
    config: Arc<BrokerConfig>,
    channel: Arc<RwLock<Option<Channel>>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    state_rx: watch::Receiver<SessionState>,
}

impl BrokerSession {
    /// Creates a session handle in the `Disconnected` state.
    pub fn new(config: BrokerConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        Self {
            config: Arc::new(config),
            channel: Arc::new(RwLock::new(None)),
            state_tx: Arc::new(state_tx),
            state_rx,
        }
    }

    /// The exchange this session declares and publishes to.
    pub fn exchange(&self) -> &str {
        &self.config.exchange
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Whether a live channel is available.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Waits until the session reaches `Connected`.
    pub async fn wait_connected(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| *state == SessionState::Connected).await;
    }

    /// Borrows the live channel, if any. Returns `None` while
    /// disconnected so publishers fail fast instead of using a stale
    /// handle.
    pub async fn channel(&self) -> Option<Channel> {
        self.channel.read().await.clone()
    }

    /// Runs the connect-retry loop until the process exits.
    pub async fn run(self) {
        loop {
            self.state_tx.send_replace(SessionState::Connecting);

            match self.connect().await {
                Ok(connection) => {
                    self.state_tx.send_replace(SessionState::Connected);
                    metrics::gauge!("broker_connected").set(1.0);
                    tracing::info!(
                        url = %self.config.url,
                        exchange = %self.config.exchange,
                        "broker session established"
                    );

                    self.watch_connection(&connection).await;
                }
                Err(error) => {
                    tracing::warn!(url = %self.config.url, %error, "broker connection failed");
                }
            }

            *self.channel.write().await = None;
            self.state_tx.send_replace(SessionState::Disconnected);
            metrics::gauge!("broker_connected").set(0.0);

            tokio::time::sleep(self.config.retry_interval).await;
        }
    }

    async fn connect(&self) -> Result<Connection, lapin::Error> {
        let connection =
            Connection::connect(&self.config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        *self.channel.write().await = Some(channel);
        Ok(connection)
    }

    /// Blocks until the connection reports an error.
    async fn watch_connection(&self, connection: &Connection) {
        let (error_tx, error_rx) = tokio::sync::oneshot::channel();
        let mut error_tx = Some(error_tx);
        connection.on_error(move |error| {
            if let Some(tx) = error_tx.take() {
                let _ = tx.send(error);
            }
        });

        match error_rx.await {
            Ok(error) => tracing::warn!(%error, "broker connection lost"),
            Err(_) => tracing::warn!("broker connection closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_disconnected() {
        let session = BrokerSession::new(BrokerConfig::default());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn no_channel_while_disconnected() {
        let session = BrokerSession::new(BrokerConfig::default());
        assert!(session.channel().await.is_none());
    }

    #[test]
    fn state_labels() {
        assert_eq!(SessionState::Connected.as_str(), "connected");
        assert_eq!(SessionState::Disconnected.as_str(), "disconnected");
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
    }
}
