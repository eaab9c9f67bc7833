//! Analytics endpoints.
//!
//! `GET /api/analytics` serves the cached aggregate — eventually
//! consistent, lagging the store by broker/consumer health, but it never
//! blocks on a live refresh. `GET /api/stats` runs directly against the
//! store and is always current.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use note_store::{NoteStats, NoteStore};
use projections::AnalyticsSnapshot;

use crate::error::ApiError;
use crate::routes::notes::AppState;

/// GET /api/analytics — the latest swapped-in cache snapshot.
#[tracing::instrument(skip(state))]
pub async fn cached<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<AnalyticsSnapshot> {
    Json((*state.analytics.snapshot().await).clone())
}

/// GET /api/stats — live statistics computed against the store.
#[tracing::instrument(skip(state))]
pub async fn stats<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<NoteStats>, ApiError> {
    Ok(Json(state.store.stats().await?))
}
