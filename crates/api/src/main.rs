//! Service entry point.

use std::sync::Arc;
use std::time::Duration;

use broker::{AmqpBus, BrokerConfig, BrokerSession, EventBus, SubscribeOptions};
use note_store::PostgresNoteStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = api::config::Config::from_env();

    // 3. Connect to the authoritative store (bounded pool, deliberate
    // acquire timeout so a hung database cannot pin the worker pool)
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let store = PostgresNoteStore::new(pool);
    store.run_migrations().await.expect("migrations failed");

    // 4. Start the broker session retry loop
    let session = BrokerSession::new(BrokerConfig {
        url: config.rabbitmq_url.clone(),
        ..BrokerConfig::default()
    });
    tokio::spawn(session.clone().run());

    let bus: Arc<dyn EventBus> = Arc::new(AmqpBus::new(session));
    let (state, analytics) = api::create_state(store, bus.clone());

    // 5. Eager refresh so readers see real counts before the first event;
    // an unreachable store here is not fatal, the consumer will retry.
    if let Err(error) = analytics.refresh().await {
        tracing::warn!(%error, "initial analytics refresh failed");
    }

    // 6. Start the analytics consumer
    api::spawn_consumer(
        bus,
        analytics,
        SubscribeOptions {
            queue: config.consumer_queue.clone(),
            binding: "note.#".to_string(),
            prefetch: config.consumer_prefetch,
        },
    );

    // 7. Serve
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting notes service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
