//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Coarse classification used for HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Your account has been suspended")]
    AccountBanned,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    EmailNotVerified,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Help request not found")]
    RequestNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Invalid or expired token")]
    InvalidVerificationToken,

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Core(#[from] scan_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Unauthenticated(_)
            | ScanError::InvalidRefreshToken
            | ScanError::InvalidCredentials => ErrorKind::Unauthenticated,
            ScanError::AccountBanned | ScanError::EmailNotVerified | ScanError::Forbidden(_) => {
                ErrorKind::Forbidden
            }
            ScanError::AccountNotFound | ScanError::RequestNotFound => ErrorKind::NotFound,
            ScanError::EmailAlreadyExists => ErrorKind::Conflict,
            ScanError::InvalidVerificationToken
            | ScanError::PasswordTooShort
            | ScanError::PasswordTooLong
            | ScanError::ValidationError(_) => ErrorKind::Validation,
            ScanError::Core(e) if e.is_validation() => ErrorKind::Validation,
            ScanError::Core(e) if e.is_conflict() => ErrorKind::Conflict,
            ScanError::Core(e) if e.is_token() => ErrorKind::Unauthenticated,
            ScanError::Core(_) | ScanError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(e: rusqlite::Error) -> Self {
        ScanError::Internal(format!("database: {e}"))
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
