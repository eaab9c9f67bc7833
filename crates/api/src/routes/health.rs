//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use broker::EventBus;
use note_store::NoteStore;
use serde::Serialize;

use crate::routes::notes::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Broker session state. The derived views only stay fresh while
    /// this reads `"connected"`.
    pub broker: &'static str,
}

/// GET /health — returns service health and broker connectivity.
pub async fn check<S: NoteStore>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        broker: if state.bus.is_connected() {
            "connected"
        } else {
            "disconnected"
        },
    })
}
