//! Axum route handlers for profile registration and resume upload.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::discovery::contact::is_plausible_address;
use crate::errors::AppError;
use crate::models::profile::normalize_skills;
use crate::models::Profile;
use crate::profiles::extractor::ExtractError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub email: String,
}

/// POST /api/v1/profiles
///
/// Registers an empty profile. Skills and experience arrive with the first resume.
pub async fn handle_create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let email = request.email.trim();
    if !is_plausible_address(email) {
        return Err(AppError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }

    let profile = Profile::new(email);
    state.store.create_profile(&profile).await?;
    info!(profile_id = %profile.id, "profile registered");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/profiles/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .store
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))?;
    Ok(Json(profile))
}

/// POST /api/v1/profiles/:id/resume
///
/// Multipart upload, field `file`. Replaces the profile's skills and experience.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Profile>, AppError> {
    if state.store.get_profile(profile_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Profile {profile_id} not found")));
    }

    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            document = Some(bytes);
            break;
        }
    }
    let document = document
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;

    let extracted = state
        .resume_extractor
        .extract(document)
        .await
        .map_err(|e| {
            warn!(%profile_id, error = %e, "resume extraction failed");
            match e {
                ExtractError::Llm(llm) => AppError::Llm(llm.to_string()),
                other => AppError::UnprocessableEntity(other.to_string()),
            }
        })?;

    let skills = normalize_skills(&extracted.skills);
    let profile = state
        .store
        .update_resume_fields(profile_id, &skills, extracted.experience_years)
        .await?;
    info!(
        %profile_id,
        skills = profile.skills.len(),
        experience_years = ?profile.experience_years,
        "profile updated from resume"
    );
    Ok(Json(profile))
}
