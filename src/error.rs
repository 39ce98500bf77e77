/// Unified error types for the giftwish backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity missing or hidden (soft-deleted)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ownership or authorization failure
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Malformed or missing required field
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not valid given current entity state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource conflict (e.g. item already reserved)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Email already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// Email bound to a different external identity or provider
    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    /// Login credentials do not match any account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Access or refresh token rejected
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// External identity verification or metadata dependency down
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden", self.to_string()),
            ApiError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "InvalidInput", self.to_string())
            }
            ApiError::InvalidState(_) => {
                (StatusCode::BAD_REQUEST, "InvalidState", self.to_string())
            }
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            ApiError::DuplicateEmail => {
                (StatusCode::CONFLICT, "DuplicateEmail", self.to_string())
            }
            ApiError::IdentityConflict(_) => {
                (StatusCode::CONFLICT, "IdentityConflict", self.to_string())
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "InvalidCredentials", self.to_string())
            }
            ApiError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "InvalidToken", self.to_string())
            }
            ApiError::UpstreamUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UpstreamUnavailable",
                self.to_string(),
            ),
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// True if the error is a storage-level uniqueness violation.
///
/// Races on unique columns (email, external identity, full reservation) are
/// re-classified by callers into the matching domain error instead of
/// surfacing as a raw storage failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let response = ApiError::Internal("secret query text".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn taxonomy_maps_to_stable_statuses() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::DuplicateEmail, StatusCode::CONFLICT),
            (ApiError::IdentityConflict("x".into()), StatusCode::CONFLICT),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken("x".into()), StatusCode::UNAUTHORIZED),
            (
                ApiError::UpstreamUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
