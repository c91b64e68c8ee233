//! Error types for the fetch module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for page fetches
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The request did not complete in time
    #[error("Timed out fetching {0}")]
    Timeout(String),

    /// The site served a bot check instead of the page
    #[error("Blocked by bot check at {0}")]
    Blocked(String),

    /// Invalid header or URL in the request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        CrateError::Fetch(err.to_string())
    }
}
