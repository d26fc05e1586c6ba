//! License compatibility service

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use trust_registry_core::{
    is_compatible, ArtifactId, ArtifactRecord, ArtifactType, LicenseCheckResult, SourceLocator,
};
use trust_registry_db::ArtifactRepository;

use crate::dto::LicenseCheckRequest;
use crate::error::{ServiceError, ServiceResult};
use crate::source::SourceResolver;

/// Trait for license compatibility checks
#[async_trait]
pub trait LicenseService: Send + Sync {
    /// Whether a model's license is compatible with a GitHub repository's license
    async fn check(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        request: LicenseCheckRequest,
    ) -> ServiceResult<LicenseCheckResult>;
}

/// Default implementation of LicenseService
pub struct DefaultLicenseService {
    repository: Arc<dyn ArtifactRepository>,
    resolver: Arc<dyn SourceResolver>,
}

impl DefaultLicenseService {
    /// Create a new license service
    pub fn new(repository: Arc<dyn ArtifactRepository>, resolver: Arc<dyn SourceResolver>) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    async fn artifact_license(&self, record: &ArtifactRecord) -> ServiceResult<String> {
        if let Some(license) = &record.source.license {
            return Ok(license.clone());
        }
        let locator = SourceLocator::parse(&record.artifact.source_url)?;
        self.resolver
            .repository_license(&locator)
            .await?
            .ok_or_else(|| undetermined(&record.artifact.source_url))
    }

    async fn external_license(&self, locator: &SourceLocator) -> ServiceResult<String> {
        self.resolver
            .repository_license(locator)
            .await?
            .ok_or_else(|| undetermined(&locator.canonical_url()))
    }
}

fn undetermined(source: &str) -> ServiceError {
    ServiceError::UpstreamResolution(format!("license of {} could not be determined", source))
}

#[async_trait]
impl LicenseService for DefaultLicenseService {
    #[instrument(skip(self, request), fields(artifact_type = %artifact_type, id = %id, github_url = %request.github_url))]
    async fn check(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        request: LicenseCheckRequest,
    ) -> ServiceResult<LicenseCheckResult> {
        if artifact_type != ArtifactType::Model {
            return Err(ServiceError::ValidationFailed(format!(
                "License checks apply to models, got {}",
                artifact_type
            )));
        }

        let external = match SourceLocator::parse(request.github_url.trim()) {
            Ok(locator @ SourceLocator::GitHub { .. }) => locator,
            _ => {
                return Err(ServiceError::ValidationFailed(format!(
                    "Not a GitHub repository URL: {}",
                    request.github_url
                )))
            }
        };

        let record = self
            .repository
            .find_by_id(artifact_type, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", artifact_type, id)))?;

        let (artifact_license, external_license) = tokio::try_join!(
            self.artifact_license(&record),
            self.external_license(&external)
        )?;

        let compatible = is_compatible(&artifact_license, &external_license).ok_or_else(|| {
            ServiceError::UpstreamResolution(format!(
                "compatibility of {} with {} is undetermined",
                artifact_license, external_license
            ))
        })?;

        info!(%artifact_license, %external_license, compatible, "License check completed");
        Ok(LicenseCheckResult { compatible })
    }
}
