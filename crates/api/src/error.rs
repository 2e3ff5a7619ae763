//! Error types for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::classifier::ClassifierError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Rejected input.
    #[error("{0}")]
    Validation(#[from] database::ValidationError),

    /// No caller identity on the request.
    #[error("missing x-user-email header")]
    Unauthenticated,

    /// The caller has no account.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The model call failed; the credit was refunded.
    #[error("classification failed: {0}")]
    Classifier(#[from] ClassifierError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::UnknownUser(_) => StatusCode::NOT_FOUND,
            ApiError::Classifier(err) => {
                tracing::warn!("Classifier error: {}", err);
                StatusCode::BAD_GATEWAY
            }
        };

        let message = match &self {
            // Store details stay in the logs
            ApiError::Database(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::UnknownUser("a@x.com".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Validation(database::ValidationError::Empty("query".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Classifier(ClassifierError::EmptyResponse),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
