//! Store-specific error types

use thiserror::Error;
use trust_registry_core::RegistryError;

/// Result type alias for store operations
pub type DbResult<T> = Result<T, DbError>;

/// Store errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Artifact not found
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Artifact already exists
    #[error("Artifact already exists: {0}")]
    AlreadyExists(String),

    /// Invalid query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] RegistryError),

    /// Internal store error
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl DbError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}
