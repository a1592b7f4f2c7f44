/// Unified error types for the Sakan identity core
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum SakanError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (bad credentials, invalid/expired/reused tokens)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (valid identity, insufficient role)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors (malformed request, invalid national id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict errors (duplicate email or national id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert SakanError to HTTP response
///
/// This is the single translation table from error kinds to transport
/// status codes. Handlers never map errors to statuses themselves.
impl IntoResponse for SakanError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            SakanError::RateLimitExceeded { retry_after } => Some(retry_after.as_secs()),
            _ => None,
        };

        let (status, error_code, message) = match self {
            SakanError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            SakanError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            SakanError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            SakanError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            SakanError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            SakanError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            SakanError::Database(_)
            | SakanError::Internal(_)
            | SakanError::Jwt(_)
            | SakanError::Io(_) => {
                tracing::error!(error = %self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for service operations
pub type SakanResult<T> = Result<T, SakanError>;
