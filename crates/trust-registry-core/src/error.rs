//! Error types for the trust registry domain

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Main error type for domain operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Artifact not found
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Unknown artifact type
    #[error("Invalid artifact type: {0}")]
    InvalidArtifactType(String),

    /// Invalid artifact identifier
    #[error("Invalid artifact id: {0}")]
    InvalidArtifactId(String),

    /// Source URL cannot be interpreted
    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Circular dependency detected
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::InvalidSourceUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::ArtifactNotFound("01HXYZ".to_string());
        assert_eq!(err.to_string(), "Artifact not found: 01HXYZ");
    }

    #[test]
    fn test_url_error_conversion() {
        let err: RegistryError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, RegistryError::InvalidSourceUrl(_)));
    }
}
