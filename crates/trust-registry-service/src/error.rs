//! Service-layer error types
//!
//! This module defines error types specific to the service layer,
//! mapping domain, store and upstream errors to service-level errors.

use thiserror::Error;
use trust_registry_core::RegistryError;
use trust_registry_db::DbError;

use crate::source::SourceError;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Artifact (or user) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request failed validation
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An external source could not be reached or returned unusable data
    #[error("Upstream resolution failed: {0}")]
    UpstreamResolution(String),

    /// The artifact graph is malformed (for example a dependency cycle)
    #[error("Structural error: {0}")]
    Structural(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ArtifactNotFound(msg) => ServiceError::NotFound(msg),
            RegistryError::InvalidArtifactType(_)
            | RegistryError::InvalidArtifactId(_)
            | RegistryError::InvalidSourceUrl(_)
            | RegistryError::ValidationError(_) => ServiceError::ValidationFailed(err.to_string()),
            RegistryError::CircularDependency(msg) => ServiceError::Structural(msg),
            RegistryError::SerializationError(msg) | RegistryError::InternalError(msg) => {
                ServiceError::Internal(msg)
            }
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            DbError::AlreadyExists(msg) => ServiceError::Internal(format!("duplicate id: {}", msg)),
            DbError::InvalidQuery(msg) => ServiceError::ValidationFailed(msg),
            DbError::Domain(err) => ServiceError::from(err),
            DbError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<SourceError> for ServiceError {
    fn from(err: SourceError) -> Self {
        ServiceError::UpstreamResolution(err.to_string())
    }
}

impl From<regex::Error> for ServiceError {
    fn from(err: regex::Error) -> Self {
        ServiceError::ValidationFailed(format!("Invalid regex: {}", err))
    }
}
