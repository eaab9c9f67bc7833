//! HTTP service for the notes synchronization system.
//!
//! Wires the producer path (note CRUD, publishing an event per committed
//! mutation), the consumer path (analytics cache projector fed from the
//! broker), and the synchronous share-access path, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use broker::{EventBus, EventConsumer, EventPublisher, SubscribeOptions};
use metrics_exporter_prometheus::PrometheusHandle;
use note_store::NoteStore;
use projections::{AnalyticsProjector, ShareAccess};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::notes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: NoteStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/api/notes",
            get(routes::notes::list::<S>).post(routes::notes::create::<S>),
        )
        .route(
            "/api/notes/{id}",
            get(routes::notes::get::<S>)
                .put(routes::notes::update::<S>)
                .delete(routes::notes::delete::<S>),
        )
        .route(
            "/api/notes/{id}/favorite",
            patch(routes::notes::toggle_favorite::<S>),
        )
        .route("/api/notes/{id}/pin", patch(routes::notes::toggle_pin::<S>))
        .route(
            "/api/notes/{id}/share",
            post(routes::share::issue::<S>).delete(routes::share::revoke::<S>),
        )
        .route("/api/notes/{id}/share/stats", get(routes::share::stats::<S>))
        .route("/api/shared", get(routes::share::list::<S>))
        .route("/api/shared/{token}", get(routes::share::resolve::<S>))
        .route("/api/analytics", get(routes::analytics::cached::<S>))
        .route("/api/stats", get(routes::analytics::stats::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the shared application state over a store and a bus.
///
/// Returns the state plus the analytics projector so the caller can run
/// the eager startup refresh and hand the projector to a consumer.
pub fn create_state<S: NoteStore + Clone + 'static>(
    store: S,
    bus: Arc<dyn EventBus>,
) -> (Arc<AppState<S>>, Arc<AnalyticsProjector<S>>) {
    let publisher = EventPublisher::new(bus.clone());
    let analytics = Arc::new(AnalyticsProjector::new(store.clone()));
    let share = ShareAccess::new(store.clone(), publisher.clone());

    let state = Arc::new(AppState {
        store,
        publisher,
        analytics: analytics.clone(),
        share,
        bus,
    });

    (state, analytics)
}

/// Spawns the analytics consumer as a background task.
pub fn spawn_consumer<S: NoteStore + 'static>(
    bus: Arc<dyn EventBus>,
    projector: Arc<AnalyticsProjector<S>>,
    options: SubscribeOptions,
) -> tokio::task::JoinHandle<()> {
    let consumer = EventConsumer::new(bus, options);
    tokio::spawn(consumer.run(projector))
}
