//! Axum route handler for outreach.

use axum::{
    extract::{Path, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::outreach::orchestrator::OutreachResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyRequest {
    pub override_recipient: Option<String>,
}

impl ApplyRequest {
    /// An empty body means "no override". Anything else must parse,
    /// since sending is irreversible.
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("invalid apply request body: {e}")))
    }
}

/// POST /api/v1/postings/:id/apply
///
/// Composes and sends the application email, then marks the posting applied.
/// The body is optional.
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(posting_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<OutreachResult>, AppError> {
    let request = ApplyRequest::from_body(&body)?;
    let result = state
        .outreach
        .apply(posting_id, request.override_recipient.as_deref())
        .await?;
    Ok(Json(result))
}
