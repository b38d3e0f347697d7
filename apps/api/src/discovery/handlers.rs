//! Axum route handlers for search runs and the posting set.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Posting, SearchRun};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchAcceptedResponse {
    pub accepted: bool,
    pub run_id: Uuid,
}

/// POST /api/v1/profiles/:id/search
///
/// Queues a background search run and acknowledges immediately.
pub async fn handle_trigger_search(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SearchAcceptedResponse>), AppError> {
    let run = state.search.submit(profile_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SearchAcceptedResponse {
            accepted: true,
            run_id: run.id,
        }),
    ))
}

/// GET /api/v1/runs/:id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<SearchRun>, AppError> {
    let run = state
        .store
        .get_run(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;
    Ok(Json(run))
}

/// GET /api/v1/profiles/:id/runs
pub async fn handle_list_runs(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Vec<SearchRun>>, AppError> {
    ensure_profile(&state, profile_id).await?;
    Ok(Json(state.store.list_runs(profile_id).await?))
}

/// GET /api/v1/profiles/:id/postings
pub async fn handle_list_postings(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Vec<Posting>>, AppError> {
    ensure_profile(&state, profile_id).await?;
    Ok(Json(state.store.list_postings(profile_id).await?))
}

async fn ensure_profile(state: &AppState, profile_id: Uuid) -> Result<(), AppError> {
    state
        .store
        .get_profile(profile_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))
}
