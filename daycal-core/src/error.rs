//! Error types for daycal.

use thiserror::Error;

/// Errors that can occur in daycal operations.
#[derive(Error, Debug)]
pub enum DaycalError {
    #[error("Invalid event: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Remote operation failed: {0}")]
    RemoteOperation(String),

    #[error("Live feed error: {0}")]
    Feed(String),

    #[error("Local cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an event is rejected before it reaches the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("event id must not be empty")]
    EmptyId,

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("end time {end} must be after start time {start}")]
    EndTimeNotAfterStart { start: String, end: String },

    #[error("event spans {days} days, more than the allowed {max}")]
    SpanTooLong { days: i64, max: i64 },
}

/// Result type alias for daycal operations.
pub type DaycalResult<T> = Result<T, DaycalError>;
