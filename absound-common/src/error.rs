//! Common error types for absound

use thiserror::Error;

/// Common result type for absound operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the absound crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key-value store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Imported tournament state rejected; in-memory state left untouched
    #[error("Import rejected: {0}")]
    Import(String),
}
