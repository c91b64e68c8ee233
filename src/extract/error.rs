//! Error types for the extract module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for building extraction rules
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A CSS selector in a strategy table did not parse
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// A regular expression in a strategy table did not compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        CrateError::Extract(err.to_string())
    }
}
