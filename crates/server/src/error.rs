// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use glassbox_core::{DriverError, RegistryError, SubscriptionError};
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

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<DriverError> for ApiError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::UnknownJob { .. } => ApiError::JobNotFound(err.job_id().to_string()),
            DriverError::AlreadyStarted { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::BusClosed => ApiError::Unavailable(err.to_string()),
            SubscriptionError::Released { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Unauthorized => {
                tracing::warn!("Rejected unauthenticated request");
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized"))
            }
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::DocumentNotFound(id) => {
                tracing::warn!(job_id = %id, "Document not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Document not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Not found", msg.clone()),
            ),
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Conflict", msg.clone()),
                )
            }
            ApiError::Unavailable(msg) => {
                tracing::warn!(message = %msg, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("Service unavailable", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
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
    use glassbox_core::JobId;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_unauthorized_returns_401() {
        let (status, body) = extract_response(ApiError::Unauthorized.into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "Unauthorized");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_returns_404() {
        let error: ApiError = DriverError::UnknownJob {
            job_id: JobId::new("abc123"),
        }
        .into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Job not found");
        assert!(body.details.unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_already_started_returns_409() {
        let error: ApiError = DriverError::AlreadyStarted {
            job_id: JobId::new("abc123"),
        }
        .into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.details.unwrap().contains("already started"));
    }

    #[tokio::test]
    async fn test_duplicate_job_returns_409() {
        let error: ApiError = RegistryError::DuplicateJob {
            job_id: JobId::new("dup"),
        }
        .into();
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_closed_bus_returns_503() {
        let error: ApiError = SubscriptionError::BusClosed.into();
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let error = ApiError::Internal("Something went wrong".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        // Internal errors should NOT expose details to clients
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details")); // None should be skipped

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }
}
