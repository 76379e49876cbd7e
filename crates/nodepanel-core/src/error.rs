//! Error types for `NodePanel` core library.

use thiserror::Error;

/// Result type alias using `NodePanel` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `NodePanel` domain helpers.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected by a validator or parser
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
