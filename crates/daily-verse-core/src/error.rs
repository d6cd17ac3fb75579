//! Error types for Daily Verse

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerseError {
    /// Referenced id has no record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness breach (duplicate username or email)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Mail could not be delivered to one recipient
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The external verse source failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
