//! Error types for the frontier module

use crate::error::Error as CrateError;
use crate::store::StoreError;
use thiserror::Error;

/// Error type for keyword generation and seeding
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The generator could not produce keywords for a category
    #[error("Generator '{generator}' failed for '{category}': {message}")]
    Generator {
        generator: String,
        category: String,
        message: String,
    },

    /// Persisting generated keywords failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<GenerateError> for CrateError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Store(e) => e.into(),
            other => CrateError::Generate(other.to_string()),
        }
    }
}
