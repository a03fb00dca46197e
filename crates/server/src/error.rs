// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keyport_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes.
///
/// Token verification failures (bad signature, wrong purpose, expired) all
/// surface as `NotFound`; callers cannot distinguish them from an unknown
/// resource.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Username or password was incorrect")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Account not confirmed")]
    Unconfirmed,

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Validation(msg) => {
                tracing::warn!(message = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Username or password was incorrect"),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Authentication required"),
            ),
            ApiError::Unconfirmed => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("Account not confirmed"),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::new("Not found")),
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (StatusCode::CONFLICT, ErrorResponse::new(msg.clone()))
            }
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    // Internal errors never expose details to clients.
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_validation_returns_400_with_message() {
        let error = ApiError::Validation("Please use a different application name".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Please use a different application name");
    }

    #[tokio::test]
    async fn test_invalid_credentials_returns_401_vague_message() {
        let error = ApiError::InvalidCredentials;
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        // Deliberately does not say whether the account exists.
        assert_eq!(body.error, "Username or password was incorrect");
    }

    #[tokio::test]
    async fn test_unconfirmed_returns_403() {
        let (status, _) = extract_response(ApiError::Unconfirmed.into_response()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_not_found_returns_404_without_detail() {
        let (status, body) = extract_response(ApiError::NotFound.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Not found");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_conflict_returns_409() {
        let error = ApiError::Conflict("Application keys are not ready yet".to_string());
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.contains("not ready"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let error = ApiError::Internal("secret backend failure".to_string());
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }
}
