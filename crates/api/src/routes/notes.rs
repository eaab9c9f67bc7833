//! Note CRUD endpoints, the producer side of the event stream.
//!
//! Every mutation commits to the authoritative store first, then
//! publishes its event. Publishing is best-effort: a down broker never
//! fails the request.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use broker::{EventBus, EventPublisher};
use common::NoteId;
use domain::{NewNote, Note, NoteEvent, NoteFilter, NoteUpdate};
use note_store::NoteStore;
use projections::{AnalyticsProjector, ShareAccess};
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: NoteStore> {
    pub store: S,
    pub publisher: EventPublisher,
    pub analytics: Arc<AnalyticsProjector<S>>,
    pub share: ShareAccess<S>,
    pub bus: Arc<dyn EventBus>,
}

#[derive(Serialize)]
pub struct ListNotesResponse {
    pub count: usize,
    pub notes: Vec<Note>,
}

/// Publishes a note event after its mutation committed.
pub(crate) async fn emit<S: NoteStore>(state: &AppState<S>, event: NoteEvent) {
    match event.to_envelope() {
        Ok(envelope) => state.publisher.publish_envelope(envelope).await,
        Err(error) => {
            tracing::warn!(event_type = event.routing_key(), %error, "failed to encode event");
        }
    }
}

fn validate_title_and_content(title: &str, content: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/notes — list notes with optional search and category filter.
#[tracing::instrument(skip(state))]
pub async fn list<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<ListNotesResponse>, ApiError> {
    let notes = state.store.list(&filter).await?;
    Ok(Json(ListNotesResponse {
        count: notes.len(),
        notes,
    }))
}

/// GET /api/notes/:id — fetch a single note.
#[tracing::instrument(skip(state))]
pub async fn get<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    let id = NoteId::new(id);
    let note = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Note {id} not found")))?;
    Ok(Json(note))
}

/// POST /api/notes — create a note and publish `note.created`.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewNote>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    validate_title_and_content(&req.title, &req.content)?;

    let note = state.store.create(req).await?;
    metrics::counter!("notes_created").increment(1);
    emit(&state, NoteEvent::Created(note.clone())).await;

    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/:id — replace a note's fields and publish `note.updated`.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(req): Json<NoteUpdate>,
) -> Result<Json<Note>, ApiError> {
    validate_title_and_content(&req.title, &req.content)?;

    let note = state.store.update(NoteId::new(id), req).await?;
    emit(&state, NoteEvent::Updated(note.clone())).await;

    Ok(Json(note))
}

/// DELETE /api/notes/:id — delete a note and publish `note.deleted`.
#[tracing::instrument(skip(state))]
pub async fn delete<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    let note = state.store.delete(NoteId::new(id)).await?;
    emit(&state, NoteEvent::Deleted { id: note.id }).await;

    Ok(Json(note))
}

/// PATCH /api/notes/:id/favorite — flip the favorite flag.
#[tracing::instrument(skip(state))]
pub async fn toggle_favorite<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    let note = state.store.toggle_favorite(NoteId::new(id)).await?;
    emit(&state, NoteEvent::FavoriteToggled(note.clone())).await;

    Ok(Json(note))
}

/// PATCH /api/notes/:id/pin — flip the pin flag.
#[tracing::instrument(skip(state))]
pub async fn toggle_pin<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    let note = state.store.toggle_pin(NoteId::new(id)).await?;
    emit(&state, NoteEvent::PinToggled(note.clone())).await;

    Ok(Json(note))
}
