//! Data Transfer Objects (DTOs) for service layer
//!
//! This module defines request and response types used at service boundaries,
//! separating internal domain models from external interfaces.

use serde::{Deserialize, Serialize};
use trust_registry_core::ArtifactMetadata;

use crate::error::{ServiceError, ServiceResult};

// ============================================================================
// Catalogue DTOs
// ============================================================================

/// Body of artifact create and update requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSourceRequest {
    /// Source URL of the artifact
    pub url: String,
}

impl ArtifactSourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.url.trim().is_empty() {
            return Err(ServiceError::ValidationFailed(
                "Artifact url is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of an artifact listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPage {
    /// Matching artifacts on this page
    pub artifacts: Vec<ArtifactMetadata>,

    /// Offset of the next page, absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,

    /// Total number of matches
    pub total: usize,
}

/// Body of a regex search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexSearchRequest {
    /// Pattern matched against artifact names
    pub regex: String,
}

// ============================================================================
// License DTOs
// ============================================================================

/// Body of a license compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCheckRequest {
    /// GitHub repository whose license is compared
    pub github_url: String,
}

// ============================================================================
// Authentication DTOs
// ============================================================================

/// User part of an authentication request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub name: String,

    #[serde(default)]
    pub is_admin: bool,
}

/// Secret part of an authentication request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSecret {
    pub password: String,
}

impl std::fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSecret").field("password", &"***").finish()
    }
}

/// Body of `PUT /authenticate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub user: UserIdentity,
    pub secret: UserSecret,
}

impl AuthenticateRequest {
    pub fn new(name: impl Into<String>, password: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user: UserIdentity {
                name: name.into(),
                is_admin,
            },
            secret: UserSecret {
                password: password.into(),
            },
        }
    }
}

/// Request to add a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub user: UserIdentity,
    pub secret: UserSecret,
}

impl RegisterUserRequest {
    pub fn new(name: impl Into<String>, password: impl Into<String>, is_admin: bool) -> Self {
        let AuthenticateRequest { user, secret } = AuthenticateRequest::new(name, password, is_admin);
        Self { user, secret }
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.user.name.trim().is_empty() {
            return Err(ServiceError::ValidationFailed("User name is required".to_string()));
        }
        if self.secret.password.is_empty() {
            return Err(ServiceError::ValidationFailed("Password is required".to_string()));
        }
        Ok(())
    }
}

/// A successfully authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub name: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_source_request_validation() {
        assert!(ArtifactSourceRequest::new("https://huggingface.co/gpt2").validate().is_ok());
        assert!(matches!(
            ArtifactSourceRequest::new("  ").validate(),
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_authenticate_request_shape() {
        let json = r#"{"user":{"name":"alice","is_admin":true},"secret":{"password":"pw"}}"#;
        let request: AuthenticateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request, AuthenticateRequest::new("alice", "pw", true));
        assert!(!format!("{:?}", request).contains("pw\""));
    }

    #[test]
    fn test_is_admin_defaults_to_false() {
        let json = r#"{"user":{"name":"bob"},"secret":{"password":"pw"}}"#;
        let request: AuthenticateRequest = serde_json::from_str(json).unwrap();
        assert!(!request.user.is_admin);
    }
}
