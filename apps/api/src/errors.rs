use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::discovery::runner::SearchError;
use crate::outreach::orchestrator::OutreachError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// The request is well-formed but the resource is in the wrong state for it.
    #[error("{message}")]
    Precondition { code: &'static str, message: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Precondition { code, message } => (StatusCode::CONFLICT, *code, message.clone()),
            AppError::Delivery(msg) => {
                tracing::warn!("Delivery error: {msg}");
                (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED", msg.clone())
            }
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => AppError::Database(e),
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            e @ StoreError::Duplicate(_) => AppError::Precondition {
                code: "DUPLICATE",
                message: e.to_string(),
            },
            e @ StoreError::Corrupt(_) => AppError::Internal(e.into()),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            e @ SearchError::ProfileNotFound(_) => AppError::NotFound(e.to_string()),
            SearchError::ProfileIncomplete(reason) => AppError::Validation(reason.to_string()),
            SearchError::Store(e) => e.into(),
            e @ (SearchError::QueueFull | SearchError::QueueClosed) => {
                AppError::Unavailable(e.to_string())
            }
        }
    }
}

impl From<OutreachError> for AppError {
    fn from(e: OutreachError) -> Self {
        match e {
            e @ (OutreachError::PostingNotFound(_) | OutreachError::ProfileNotFound(_)) => {
                AppError::NotFound(e.to_string())
            }
            OutreachError::ProfileIncomplete(reason) => AppError::Validation(reason.to_string()),
            e @ OutreachError::AlreadyApplied(_) => AppError::Precondition {
                code: "ALREADY_APPLIED",
                message: e.to_string(),
            },
            e @ OutreachError::RecipientMissing => AppError::Precondition {
                code: "RECIPIENT_MISSING",
                message: e.to_string(),
            },
            OutreachError::Delivery(e) => AppError::Delivery(e.to_string()),
            OutreachError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_outreach_errors_map_to_statuses() {
        let cases = [
            (OutreachError::PostingNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (OutreachError::AlreadyApplied(Uuid::nil()), StatusCode::CONFLICT),
            (OutreachError::RecipientMissing, StatusCode::CONFLICT),
            (
                OutreachError::Delivery(crate::outreach::transport::MailError::Rejected {
                    status: 500,
                    message: "down".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_full_search_queue_is_unavailable() {
        let response = AppError::from(SearchError::QueueFull).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_duplicate_store_error_is_conflict() {
        let response = AppError::from(StoreError::Duplicate("profile".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
