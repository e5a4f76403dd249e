//! Error types for the jot sync core.

use thiserror::Error;

/// Result type alias using jot's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sync and storage operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation attempted while network connectivity is absent
    #[error("Offline: network connectivity is unavailable")]
    Offline,

    /// Remote upload/download call reported failure
    #[error("Remote error: {0}")]
    Remote(String),

    /// Local database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Remote(e.to_string())
    }
}
