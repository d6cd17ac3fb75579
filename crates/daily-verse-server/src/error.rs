//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use verse_core::VerseError;

/// Error returned by handlers, rendered as `{"message": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Server-side failure. Details go to the log, not the client.
    pub fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
    }
}

impl From<VerseError> for ApiError {
    fn from(e: VerseError) -> Self {
        match e {
            VerseError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            VerseError::ConstraintViolation(msg) | VerseError::Validation(msg) => {
                Self::bad_request(msg)
            }
            VerseError::AuthenticationFailed(msg) => Self::unauthorized(msg),
            other => Self::internal("Internal server error", other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.message }));
        (self.status, body).into_response()
    }
}
