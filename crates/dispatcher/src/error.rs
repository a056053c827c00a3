//! Error types for the dispatcher API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use matching::MatchingError;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Matching engine error.
    #[error("{0}")]
    Matching(#[from] MatchingError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(err) => database_status(err),
            ApiError::Matching(err) => match err {
                MatchingError::Database(inner) => database_status(inner),
                MatchingError::Validation(_) => StatusCode::BAD_REQUEST,
                MatchingError::Forbidden { .. } | MatchingError::NotOwner { .. } => {
                    StatusCode::FORBIDDEN
                }
                MatchingError::ExecutorBlocked { .. } => StatusCode::LOCKED,
                MatchingError::InvalidTransition { .. } | MatchingError::NotOffered { .. } => {
                    StatusCode::CONFLICT
                }
            },
        }
    }
}

fn database_status(err: &DatabaseError) -> StatusCode {
    if err.is_busy() {
        return StatusCode::CONFLICT;
    }
    match err {
        DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
        DatabaseError::AlreadyExists { .. } => StatusCode::CONFLICT,
        DatabaseError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let already_handled = match &self {
            ApiError::Matching(err) => err.is_already_handled(),
            ApiError::Database(err) => {
                err.is_busy()
                    || matches!(
                        err,
                        DatabaseError::NotFound { .. } | DatabaseError::AlreadyExists { .. }
                    )
            }
            ApiError::BadRequest(_) => false,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "already_handled": already_handled,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
