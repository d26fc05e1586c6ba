//! Catalogue service
//!
//! This module provides artifact registration and lookup: create, read,
//! update and delete by `(type, id)`, paged listing, exact-name and regex
//! search, and the administrative reset.

use async_trait::async_trait;
use regex::RegexBuilder;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactMetadata, ArtifactQuery, ArtifactRecord, ArtifactType,
    SourceLocator, SourceMetadata,
};
use trust_registry_db::{ArtifactRepository, SearchQuery};

use crate::dto::{ArtifactPage, ArtifactSourceRequest, RegexSearchRequest};
use crate::error::{ServiceError, ServiceResult};
use crate::source::SourceResolver;
use crate::stats::record_artifact_operation;

/// Trait for artifact catalogue operations
#[async_trait]
pub trait CatalogueService: Send + Sync {
    /// Register a new artifact from its source URL
    async fn create_artifact(
        &self,
        artifact_type: ArtifactType,
        request: ArtifactSourceRequest,
    ) -> ServiceResult<Artifact>;

    /// Get an artifact by type and id
    async fn get_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<Artifact>;

    /// Replace an artifact's source URL
    async fn update_artifact(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        request: ArtifactSourceRequest,
    ) -> ServiceResult<Artifact>;

    /// Delete an artifact
    async fn delete_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<()>;

    /// List artifacts matching any of `queries`, starting at `offset`
    async fn list_artifacts(&self, queries: Vec<ArtifactQuery>, offset: usize) -> ServiceResult<ArtifactPage>;

    /// Artifacts whose name equals `name`
    async fn find_by_name(&self, name: &str) -> ServiceResult<Vec<ArtifactMetadata>>;

    /// Artifacts whose name matches a regular expression
    async fn find_by_regex(&self, request: RegexSearchRequest) -> ServiceResult<Vec<ArtifactMetadata>>;

    /// Remove every artifact; returns how many were removed
    async fn reset(&self) -> ServiceResult<usize>;

    /// Number of registered artifacts
    async fn count(&self) -> ServiceResult<usize>;

    /// Check the store is responsive
    async fn health_check(&self) -> ServiceResult<()>;
}

/// Catalogue limits
#[derive(Debug, Clone)]
pub struct CatalogueConfig {
    /// Page size of artifact listings
    pub page_size: usize,

    /// Compiled size limit for search patterns, in bytes
    pub regex_size_limit: usize,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            regex_size_limit: 64 * 1024,
        }
    }
}

/// Default implementation of CatalogueService
pub struct DefaultCatalogueService {
    repository: Arc<dyn ArtifactRepository>,
    resolver: Arc<dyn SourceResolver>,
    config: CatalogueConfig,
}

impl DefaultCatalogueService {
    /// Create a new catalogue service
    pub fn new(
        repository: Arc<dyn ArtifactRepository>,
        resolver: Arc<dyn SourceResolver>,
        config: CatalogueConfig,
    ) -> Self {
        Self {
            repository,
            resolver,
            config,
        }
    }

    /// Resolve ingest metadata; failures leave it empty
    async fn ingest_metadata(&self, source_url: &str) -> SourceMetadata {
        let locator = match SourceLocator::parse(source_url) {
            Ok(locator) => locator,
            Err(e) => {
                warn!(source_url, error = %e, "Cannot resolve metadata for unparsable URL");
                return SourceMetadata::default();
            }
        };

        match self.resolver.resolve(&locator).await {
            Ok(profile) => profile.source_metadata(),
            Err(e) => {
                warn!(source_url, error = %e, "Source metadata unavailable, storing artifact without it");
                SourceMetadata::default()
            }
        }
    }

    async fn search_names<F>(&self, mut predicate: F) -> ServiceResult<Vec<ArtifactMetadata>>
    where
        F: FnMut(&str) -> bool + Send,
    {
        let snapshot = self.repository.snapshot().await?;
        let mut matches: Vec<ArtifactMetadata> = snapshot
            .records()
            .filter(|r| predicate(&r.artifact.name))
            .map(|r| r.artifact.metadata())
            .collect();
        matches.sort_by_key(|m| m.id);
        Ok(matches)
    }
}

#[async_trait]
impl CatalogueService for DefaultCatalogueService {
    #[instrument(skip(self, request), fields(artifact_type = %artifact_type, url = %request.url))]
    async fn create_artifact(
        &self,
        artifact_type: ArtifactType,
        request: ArtifactSourceRequest,
    ) -> ServiceResult<Artifact> {
        request.validate()?;

        let artifact = Artifact::new(artifact_type, request.url.trim())?;
        let metadata = self.ingest_metadata(&artifact.source_url).await;
        let result = self
            .repository
            .create(ArtifactRecord::new(artifact, metadata))
            .await;
        record_artifact_operation("create", result.is_ok());

        let record = result?;
        info!(id = %record.id(), name = %record.artifact.name, "Artifact registered");
        Ok(record.artifact)
    }

    #[instrument(skip(self), fields(artifact_type = %artifact_type, id = %id))]
    async fn get_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<Artifact> {
        debug!("Getting artifact");
        self.repository
            .find_by_id(artifact_type, id)
            .await?
            .map(|record| record.artifact)
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", artifact_type, id)))
    }

    #[instrument(skip(self, request), fields(artifact_type = %artifact_type, id = %id))]
    async fn update_artifact(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        request: ArtifactSourceRequest,
    ) -> ServiceResult<Artifact> {
        request.validate()?;

        let mut record = self
            .repository
            .find_by_id(artifact_type, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", artifact_type, id)))?;

        let source_url = request.url.trim().to_string();
        let locator = SourceLocator::parse(&source_url)?;
        locator.ensure_supports(artifact_type)?;

        let metadata = self.ingest_metadata(&source_url).await;
        record.replace_source(source_url, locator.name().to_string(), metadata);

        let result = self.repository.update(record).await;
        record_artifact_operation("update", result.is_ok());
        Ok(result?.artifact)
    }

    #[instrument(skip(self), fields(artifact_type = %artifact_type, id = %id))]
    async fn delete_artifact(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<()> {
        let result = self.repository.delete(artifact_type, id).await;
        record_artifact_operation("delete", result.is_ok());
        result?;
        info!("Artifact deleted");
        Ok(())
    }

    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    async fn list_artifacts(&self, queries: Vec<ArtifactQuery>, offset: usize) -> ServiceResult<ArtifactPage> {
        if queries.is_empty() {
            return Err(ServiceError::ValidationFailed(
                "At least one artifact query is required".to_string(),
            ));
        }

        let query = SearchQuery::new(queries)
            .limit(self.config.page_size.max(1))
            .offset(offset);
        let results = self.repository.search(&query).await?;

        Ok(ArtifactPage {
            next_offset: results.next_offset(),
            total: results.total,
            artifacts: results.records.iter().map(|r| r.artifact.metadata()).collect(),
        })
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> ServiceResult<Vec<ArtifactMetadata>> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationFailed("Name cannot be empty".to_string()));
        }
        self.search_names(|candidate| candidate == name).await
    }

    #[instrument(skip(self, request), fields(regex = %request.regex))]
    async fn find_by_regex(&self, request: RegexSearchRequest) -> ServiceResult<Vec<ArtifactMetadata>> {
        if request.regex.is_empty() {
            return Err(ServiceError::ValidationFailed("Regex cannot be empty".to_string()));
        }

        let pattern = RegexBuilder::new(&request.regex)
            .size_limit(self.config.regex_size_limit)
            .dfa_size_limit(self.config.regex_size_limit)
            .build()?;

        self.search_names(|candidate| pattern.is_match(candidate)).await
    }

    #[instrument(skip(self))]
    async fn reset(&self) -> ServiceResult<usize> {
        let removed = self.repository.reset().await?;
        record_artifact_operation("reset", true);
        Ok(removed)
    }

    async fn count(&self) -> ServiceResult<usize> {
        Ok(self.repository.count().await?)
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(self.repository.health_check().await?)
    }
}
