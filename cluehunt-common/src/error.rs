//! Common error types for the clue hunt

use thiserror::Error;

/// Common result type for clue hunt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the server and its tooling
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error, e.g. a malformed game config file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML bootstrap config could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
