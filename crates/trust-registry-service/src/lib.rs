//! Service layer for the Trust Registry
//!
//! This crate sits between the HTTP API and the artifact store. It resolves
//! artifacts against their upstream sources and implements the scoring,
//! accounting and provenance logic.
//!
//! # Architecture
//!
//! - **CatalogueService**: artifact registration, lookup, search and reset
//! - **RatingService**: concurrent metric evaluation and net score
//! - **CostService**: storage footprint with optional dependency closure
//! - **LineageService**: provenance graph around a model
//! - **LicenseService**: model license vs. GitHub repository license
//! - **AuthService**: user directory backing token issuance
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trust_registry_db::InMemoryArtifactRepository;
//! use trust_registry_service::{ServiceConfig, ServiceRegistry, StaticSourceResolver};
//!
//! let services = ServiceRegistry::new(
//!     Arc::new(InMemoryArtifactRepository::new()),
//!     Arc::new(StaticSourceResolver::new()),
//!     ServiceConfig::default(),
//! );
//! # let _ = services;
//! ```

pub mod auth;
pub mod catalogue;
pub mod cost;
pub mod dto;
pub mod error;
pub mod evaluators;
pub mod license;
pub mod lineage;
pub mod rating;
pub mod source;
pub mod stats;

// Re-export main types for convenience
pub use dto::*;
pub use error::{ServiceError, ServiceResult};
pub use source::{
    Contribution, HttpSourceResolver, SourceError, SourceProfile, SourceResolver, StaticSourceResolver,
    UpstreamConfig,
};

// Re-export service traits and implementations
pub use auth::{AuthService, DefaultAuthService, UserDirectoryConfig};
pub use catalogue::{CatalogueConfig, CatalogueService, DefaultCatalogueService};
pub use cost::{CostService, DefaultCostService};
pub use evaluators::{default_evaluators, EvaluatorRunner};
pub use license::{DefaultLicenseService, LicenseService};
pub use lineage::{DefaultLineageService, LineageService};
pub use rating::{DefaultRatingService, RatingService};

use std::sync::Arc;
use std::time::Duration;
use trust_registry_db::ArtifactRepository;

/// Service crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tunables shared by the default service implementations
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub catalogue: CatalogueConfig,

    /// Upper bound on each metric evaluator
    pub evaluator_timeout: Duration,

    pub users: UserDirectoryConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            catalogue: CatalogueConfig::default(),
            evaluator_timeout: Duration::from_secs(10),
            users: UserDirectoryConfig::default(),
        }
    }
}

/// Service registry that holds all service instances
#[derive(Clone)]
pub struct ServiceRegistry {
    pub catalogue: Arc<dyn CatalogueService>,
    pub rating: Arc<dyn RatingService>,
    pub cost: Arc<dyn CostService>,
    pub lineage: Arc<dyn LineageService>,
    pub license: Arc<dyn LicenseService>,
    pub auth: Arc<dyn AuthService>,
}

impl ServiceRegistry {
    /// Create a new service registry with default implementations
    pub fn new(
        repository: Arc<dyn ArtifactRepository>,
        resolver: Arc<dyn SourceResolver>,
        config: ServiceConfig,
    ) -> Self {
        let ServiceConfig {
            catalogue,
            evaluator_timeout,
            users,
        } = config;

        Self {
            catalogue: Arc::new(DefaultCatalogueService::new(
                repository.clone(),
                resolver.clone(),
                catalogue,
            )),
            rating: Arc::new(DefaultRatingService::new(
                repository.clone(),
                resolver.clone(),
                EvaluatorRunner::new(default_evaluators(evaluator_timeout), evaluator_timeout),
            )),
            cost: Arc::new(DefaultCostService::new(repository.clone(), resolver.clone())),
            lineage: Arc::new(DefaultLineageService::new(repository.clone())),
            license: Arc::new(DefaultLicenseService::new(repository, resolver)),
            auth: Arc::new(DefaultAuthService::new(users)),
        }
    }

    pub fn catalogue(&self) -> &Arc<dyn CatalogueService> {
        &self.catalogue
    }

    pub fn rating(&self) -> &Arc<dyn RatingService> {
        &self.rating
    }

    pub fn cost(&self) -> &Arc<dyn CostService> {
        &self.cost
    }

    pub fn lineage(&self) -> &Arc<dyn LineageService> {
        &self.lineage
    }

    pub fn license(&self) -> &Arc<dyn LicenseService> {
        &self.license
    }

    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.auth
    }

    /// Clear the catalogue and the non-default users
    pub async fn reset(&self) -> ServiceResult<usize> {
        let removed = self.catalogue.reset().await?;
        let users = self.auth.reset().await;
        tracing::info!(artifacts = removed, users, "Registry reset");
        Ok(removed)
    }
}

/// Builder for ServiceRegistry with custom service implementations
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    repository: Option<Arc<dyn ArtifactRepository>>,
    resolver: Option<Arc<dyn SourceResolver>>,
    config: ServiceConfig,
    rating: Option<Arc<dyn RatingService>>,
    license: Option<Arc<dyn LicenseService>>,
    auth: Option<Arc<dyn AuthService>>,
}

impl ServiceRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, repository: Arc<dyn ArtifactRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a custom rating service
    pub fn rating_service(mut self, service: Arc<dyn RatingService>) -> Self {
        self.rating = Some(service);
        self
    }

    /// Set a custom license service
    pub fn license_service(mut self, service: Arc<dyn LicenseService>) -> Self {
        self.license = Some(service);
        self
    }

    /// Set a custom auth service
    pub fn auth_service(mut self, service: Arc<dyn AuthService>) -> Self {
        self.auth = Some(service);
        self
    }

    /// Build the service registry
    ///
    /// Services not set explicitly get their default implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository or the resolver is not set.
    pub fn build(self) -> Result<ServiceRegistry, String> {
        let repository = self.repository.ok_or("Repository is required")?;
        let resolver = self.resolver.ok_or("Source resolver is required")?;

        let mut services = ServiceRegistry::new(repository, resolver, self.config);
        if let Some(rating) = self.rating {
            services.rating = rating;
        }
        if let Some(license) = self.license {
            services.license = license;
        }
        if let Some(auth) = self.auth {
            services.auth = auth;
        }
        Ok(services)
    }
}
