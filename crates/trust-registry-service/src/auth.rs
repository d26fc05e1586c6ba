//! User directory
//!
//! Users live in memory with SHA-256 password hashes. The default admin is
//! seeded from configuration and survives a registry reset; every other
//! user is dropped by it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::dto::{AuthenticateRequest, AuthenticatedUser, RegisterUserRequest};
use crate::error::{ServiceError, ServiceResult};

/// Trait for user authentication and management
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials; the admin flag comes from the directory, not the request
    async fn authenticate(&self, request: AuthenticateRequest) -> ServiceResult<AuthenticatedUser>;

    /// Current directory entry for a user, if it still exists
    async fn lookup(&self, name: &str) -> Option<AuthenticatedUser>;

    /// Add or replace a user
    async fn register_user(&self, request: RegisterUserRequest) -> ServiceResult<AuthenticatedUser>;

    /// Drop every user except the default admin, returning how many were removed
    async fn reset(&self) -> usize;
}

/// Default admin account
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDirectoryConfig {
    pub default_admin_name: String,
    pub default_admin_password: String,
}

impl Default for UserDirectoryConfig {
    fn default() -> Self {
        Self {
            default_admin_name: "admin".to_string(),
            default_admin_password: "change-me".to_string(),
        }
    }
}

impl std::fmt::Debug for UserDirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectoryConfig")
            .field("default_admin_name", &self.default_admin_name)
            .field("default_admin_password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    password_hash: String,
    is_admin: bool,
}

/// Hex-encoded SHA-256 of a password
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// In-memory implementation of AuthService
pub struct DefaultAuthService {
    config: UserDirectoryConfig,
    users: RwLock<HashMap<String, StoredUser>>,
}

impl DefaultAuthService {
    /// Create a directory holding only the default admin
    pub fn new(config: UserDirectoryConfig) -> Self {
        let users = RwLock::new(Self::seed(&config));
        Self { config, users }
    }

    fn seed(config: &UserDirectoryConfig) -> HashMap<String, StoredUser> {
        HashMap::from([(
            config.default_admin_name.clone(),
            StoredUser {
                password_hash: hash_password(&config.default_admin_password),
                is_admin: true,
            },
        )])
    }
}

#[async_trait]
impl AuthService for DefaultAuthService {
    #[instrument(skip(self, request), fields(user = %request.user.name))]
    async fn authenticate(&self, request: AuthenticateRequest) -> ServiceResult<AuthenticatedUser> {
        let users = self.users.read().await;
        let stored = users
            .get(&request.user.name)
            .filter(|user| user.password_hash == hash_password(&request.secret.password));

        match stored {
            Some(user) => {
                debug!(is_admin = user.is_admin, "User authenticated");
                Ok(AuthenticatedUser {
                    name: request.user.name,
                    is_admin: user.is_admin,
                })
            }
            None => {
                warn!("Rejected credentials");
                Err(ServiceError::Unauthorized(
                    "Invalid user name or password".to_string(),
                ))
            }
        }
    }

    async fn lookup(&self, name: &str) -> Option<AuthenticatedUser> {
        self.users.read().await.get(name).map(|user| AuthenticatedUser {
            name: name.to_string(),
            is_admin: user.is_admin,
        })
    }

    #[instrument(skip(self, request), fields(user = %request.user.name))]
    async fn register_user(&self, request: RegisterUserRequest) -> ServiceResult<AuthenticatedUser> {
        request.validate()?;
        if request.user.name == self.config.default_admin_name {
            return Err(ServiceError::ValidationFailed(
                "The default admin cannot be replaced".to_string(),
            ));
        }

        self.users.write().await.insert(
            request.user.name.clone(),
            StoredUser {
                password_hash: hash_password(&request.secret.password),
                is_admin: request.user.is_admin,
            },
        );
        info!(is_admin = request.user.is_admin, "User registered");

        Ok(AuthenticatedUser {
            name: request.user.name,
            is_admin: request.user.is_admin,
        })
    }

    async fn reset(&self) -> usize {
        let mut users = self.users.write().await;
        let removed = users.len().saturating_sub(1);
        *users = Self::seed(&self.config);
        removed
    }
}
