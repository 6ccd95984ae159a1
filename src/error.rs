//! Error types for the twocaptcha library.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the twocaptcha library.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Caller input could not be turned into a submission
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Connection failure or non-2xx HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with something other than success or not-ready
    #[error("API error: {0}")]
    Api(String),

    /// The polling deadline elapsed before the task was solved
    #[error("Timeout {}s exceeded", .0.as_secs_f64())]
    Timeout(Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`SolverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    Api,
    Timeout,
    Io,
}

impl SolverError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::Validation(_) => ErrorKind::Validation,
            SolverError::Network(_) => ErrorKind::Network,
            SolverError::Api(_) => ErrorKind::Api,
            SolverError::Timeout(_) => ErrorKind::Timeout,
            SolverError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SolverError::Validation(message.into())
    }
}

impl From<rquest::Error> for SolverError {
    fn from(err: rquest::Error) -> Self {
        SolverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(err: serde_json::Error) -> Self {
        SolverError::Api(format!("cannot decode response: {}", err))
    }
}

/// Result type alias for twocaptcha operations.
pub type Result<T> = std::result::Result<T, SolverError>;
