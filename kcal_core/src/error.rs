//! Error types for the kcal_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kcal_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store error (unknown id, bad reference)
    #[error("Store error: {0}")]
    Store(String),

    /// Import/export bundle error (setup-level, not per-row)
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// External catalog lookup error
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
