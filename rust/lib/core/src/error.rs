//! The error every blog endpoint answers with.
//!
//! Errors leave the server as `{"code": "...", "message": "..."}`. The code
//! is stable and clients branch on it; the message is for people.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Wire codes. Never renamed once released.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing post, comment, user or notification.
    #[error("{0}")]
    NotFound(String),

    /// Second vote on a poll, duplicate follow.
    #[error("{0}")]
    Conflict(String),

    /// Blank text, bad page limit, unknown cursor, self-follow.
    #[error("{0}")]
    Validation(String),

    /// No identity, or a bearer token that did not verify.
    #[error("{0}")]
    Unauthorized(String),

    /// Signed in, but acting on someone else's content.
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use error_code::*;
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            Self::Conflict(_) => (StatusCode::CONFLICT, ALREADY_EXISTS),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, VALIDATION_FAILED),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            Self::PermissionDenied(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        // Client errors are the caller's business; server ones are ours.
        if status.is_server_error() {
            error!(code, error = %self, "request failed");
        }
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
