//! Error types and Result alias for the Habitforge backend

use thiserror::Error;

/// Main error type for the Habitforge backend
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient resource: {0}")]
    InsufficientResource(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether retrying the same call can ever succeed.
    ///
    /// The offline-replay worker marks actions that failed with a terminal
    /// error as processed instead of retrying them forever; transient
    /// storage errors are left in the queue for a later pass.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidArgument(_)
                | Error::InsufficientResource(_)
                | Error::InvalidData(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
