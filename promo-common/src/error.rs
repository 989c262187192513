//! Common error types for the promotion allocation workspace

use thiserror::Error;

/// Common result type for promo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across promo crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error for snapshots and persisted campaigns
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed record or invalid request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
