//! Share endpoints: token management plus the public resolution path.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::NoteId;
use domain::Note;
use note_store::NoteStore;
use projections::{ShareGrant, ShareStats};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::notes::AppState;

/// Public view of a shared note. Share/ownership fields stay private.
#[derive(Serialize)]
pub struct SharedNoteResponse {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub color: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Note> for SharedNoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            category: note.category,
            tags: note.tags,
            color: note.color,
            view_count: note.view_count,
            created_at: note.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SharedSummary {
    pub id: NoteId,
    pub title: String,
    pub category: String,
    pub token: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ListSharedResponse {
    pub count: usize,
    pub shared: Vec<SharedSummary>,
}

/// POST /api/notes/:id/share — issue (or return the existing) share token.
#[tracing::instrument(skip(state))]
pub async fn issue<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ShareGrant>, ApiError> {
    Ok(Json(state.share.issue(NoteId::new(id)).await?))
}

/// DELETE /api/notes/:id/share — revoke the share token.
#[tracing::instrument(skip(state))]
pub async fn revoke<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.share.revoke(NoteId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/shared/:token — public access; counts the view.
#[tracing::instrument(skip(state, token))]
pub async fn resolve<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(token): Path<String>,
) -> Result<Json<SharedNoteResponse>, ApiError> {
    let note = state.share.resolve(&token).await?;
    Ok(Json(note.into()))
}

/// GET /api/notes/:id/share/stats — share statistics for one note.
#[tracing::instrument(skip(state))]
pub async fn stats<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<ShareStats>, ApiError> {
    Ok(Json(state.share.stats(NoteId::new(id)).await?))
}

/// GET /api/shared — all shared notes, most-viewed first.
#[tracing::instrument(skip(state))]
pub async fn list<S: NoteStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ListSharedResponse>, ApiError> {
    let shared: Vec<SharedSummary> = state
        .share
        .list_shared()
        .await?
        .into_iter()
        .filter_map(|note| {
            let token = note.shared_token.clone()?;
            Some(SharedSummary {
                id: note.id,
                title: note.title,
                category: note.category,
                token,
                view_count: note.view_count,
                created_at: note.created_at,
            })
        })
        .collect();

    Ok(Json(ListSharedResponse {
        count: shared.len(),
        shared,
    }))
}
