//! Server configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments (applied by `main`)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use trust_registry_api::{CorsConfig, JwtConfig};
use trust_registry_service::{CatalogueConfig, ServiceConfig, UpstreamConfig, UserDirectoryConfig};

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server settings
    pub server: HttpServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// CORS settings
    pub cors: CorsConfig,

    /// Token and default account settings
    pub auth: AuthConfig,

    /// HuggingFace and GitHub endpoints
    pub upstream: UpstreamConfig,

    /// Metric evaluation settings
    pub rating: RatingConfig,

    /// Listing and search settings
    pub catalogue: CatalogueSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Enable graceful shutdown
    pub graceful_shutdown: bool,

    /// Enable response compression
    pub compression: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            graceful_shutdown: true,
            compression: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Use JSON formatting
    pub json_format: bool,

    /// Include thread IDs
    pub include_thread_ids: bool,

    /// Include target module
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub token_expiration_seconds: i64,

    /// Account seeded at startup and after every reset
    pub default_admin_name: String,

    pub default_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let users = UserDirectoryConfig::default();
        Self {
            jwt_secret: JwtConfig::default().secret,
            token_expiration_seconds: 10 * 60 * 60,
            default_admin_name: users.default_admin_name,
            default_admin_password: users.default_admin_password,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("token_expiration_seconds", &self.token_expiration_seconds)
            .field("default_admin_name", &self.default_admin_name)
            .field("default_admin_password", &"***")
            .finish()
    }
}

impl AuthConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(self.jwt_secret.clone()).with_lifetime(self.token_expiration_seconds)
    }

    pub fn user_directory(&self) -> UserDirectoryConfig {
        UserDirectoryConfig {
            default_admin_name: self.default_admin_name.clone(),
            default_admin_password: self.default_admin_password.clone(),
        }
    }
}

/// Metric evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Upper bound on each metric evaluator, in seconds
    pub evaluator_timeout_seconds: u64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            evaluator_timeout_seconds: 10,
        }
    }
}

/// Catalogue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueSettings {
    /// Artifacts per listing page
    pub page_size: usize,

    /// Compiled size limit of search patterns, in bytes
    pub regex_size_limit: usize,
}

impl Default for CatalogueSettings {
    fn default() -> Self {
        let defaults = CatalogueConfig::default();
        Self {
            page_size: defaults.page_size,
            regex_size_limit: defaults.regex_size_limit,
        }
    }
}

impl ServerConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (TRUST_REGISTRY__*)
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            // e.g. TRUST_REGISTRY__SERVER__PORT=8080
            .add_source(
                Environment::with_prefix("TRUST_REGISTRY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Tunables for the service layer
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            catalogue: CatalogueConfig {
                page_size: self.catalogue.page_size,
                regex_size_limit: self.catalogue.regex_size_limit,
            },
            evaluator_timeout: Duration::from_secs(self.rating.evaluator_timeout_seconds.max(1)),
            users: self.auth.user_directory(),
        }
    }
}
