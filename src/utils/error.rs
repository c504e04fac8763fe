//! HTTP Errors
//!
//! The error type handlers return and the JSON body it renders to. Server
//! side failures are logged in full and answered with a generic message.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GENERIC_FAILURE: &str = "An unexpected error occurred";

/// Failure of an HTTP request
#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Email or nickname already taken
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Bad credentials or an invalid bearer token
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authenticated subject lacks a required role
    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON body of every error response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable code such as `VALIDATION_ERROR`
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

impl AppError {
    /// HTTP status this error is rendered with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error code and client-facing message
    fn body(&self) -> ErrorResponse {
        match self {
            AppError::Validation(msg) => ErrorResponse::new("VALIDATION_ERROR", msg.as_str()),
            AppError::Duplicate(msg) => ErrorResponse::new("DUPLICATE_ERROR", msg.as_str()),
            AppError::Authentication(msg) => {
                ErrorResponse::new("AUTHENTICATION_ERROR", msg.as_str())
            }
            AppError::Authorization(msg) => {
                ErrorResponse::new("AUTHORIZATION_ERROR", msg.as_str())
            }
            AppError::NotFound(msg) => ErrorResponse::new("NOT_FOUND", msg.as_str()),
            AppError::Database(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                ErrorResponse::new("INTERNAL_ERROR", GENERIC_FAILURE)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for operations that can return AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let body = AppError::Duplicate("Email already exists".into()).body();
        assert_eq!(
            body,
            ErrorResponse::new("DUPLICATE_ERROR", "Email already exists")
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Duplicate("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Authorization("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_authentication_error_sets_challenge() {
        let response = AppError::Authentication("Invalid token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let error = AppError::Internal("connection refused to 10.0.0.3".into());
        assert_eq!(error.body().message, GENERIC_FAILURE);

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }
}
