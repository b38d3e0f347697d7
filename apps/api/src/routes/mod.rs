pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::discovery::handlers as discovery;
use crate::outreach::handlers as outreach;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profiles
        .route("/api/v1/profiles", post(profiles::handle_create_profile))
        .route("/api/v1/profiles/:id", get(profiles::handle_get_profile))
        .route(
            "/api/v1/profiles/:id/resume",
            post(profiles::handle_upload_resume),
        )
        // Discovery
        .route(
            "/api/v1/profiles/:id/search",
            post(discovery::handle_trigger_search),
        )
        .route(
            "/api/v1/profiles/:id/runs",
            get(discovery::handle_list_runs),
        )
        .route(
            "/api/v1/profiles/:id/postings",
            get(discovery::handle_list_postings),
        )
        .route("/api/v1/runs/:id", get(discovery::handle_get_run))
        // Outreach
        .route("/api/v1/postings/:id/apply", post(outreach::handle_apply))
        .with_state(state)
}
