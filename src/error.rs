//! Error types for the shelf crate

use thiserror::Error;

/// Result type for shelf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for shelf operations
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure while fetching a page
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Extraction rules could not be compiled
    #[error("Extract error: {0}")]
    Extract(String),

    /// Persistent store failure
    #[error("Database error: {0}")]
    Database(String),

    /// Keyword generation failure
    #[error("Keyword generation error: {0}")]
    Generate(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export sink failure
    #[error("Export error: {0}")]
    Export(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
