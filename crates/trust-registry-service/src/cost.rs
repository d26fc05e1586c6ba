//! Cost service
//!
//! Computes the storage footprint of an artifact in MB, optionally
//! including its transitive dependencies (base models and code
//! repositories). All lookups run against one store snapshot.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use trust_registry_core::{
    bytes_to_megabytes, ArtifactId, ArtifactRecord, ArtifactType, CostEntry, CostReport,
    ProvenanceIndex, SourceLocator,
};
use trust_registry_db::ArtifactRepository;

use crate::error::{ServiceError, ServiceResult};
use crate::source::SourceResolver;

/// Trait for cost accounting
#[async_trait]
pub trait CostService: Send + Sync {
    /// Cost of an artifact, and of its dependencies when `include_dependencies` is set
    async fn cost(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        include_dependencies: bool,
    ) -> ServiceResult<CostReport>;
}

/// Default implementation of CostService
pub struct DefaultCostService {
    repository: Arc<dyn ArtifactRepository>,
    resolver: Arc<dyn SourceResolver>,
}

impl DefaultCostService {
    /// Create a new cost service
    pub fn new(repository: Arc<dyn ArtifactRepository>, resolver: Arc<dyn SourceResolver>) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// Own footprint in MB; re-resolved from the source when not recorded
    async fn own_cost(&self, record: &ArtifactRecord) -> ServiceResult<f64> {
        if let Some(size) = record.source.size_bytes {
            return Ok(bytes_to_megabytes(size));
        }

        debug!(id = %record.id(), "Size not recorded, resolving from source");
        let locator = SourceLocator::parse(&record.artifact.source_url)?;
        let profile = self.resolver.resolve(&locator).await?;
        profile.size_bytes.map(bytes_to_megabytes).ok_or_else(|| {
            ServiceError::UpstreamResolution(format!(
                "storage footprint of {} is unknown",
                record.artifact.source_url
            ))
        })
    }
}

#[async_trait]
impl CostService for DefaultCostService {
    #[instrument(skip(self), fields(artifact_type = %artifact_type, id = %id))]
    async fn cost(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
        include_dependencies: bool,
    ) -> ServiceResult<CostReport> {
        let snapshot = self.repository.snapshot().await?;
        let root = snapshot.require(artifact_type, id)?;
        let own = self.own_cost(root).await?;

        let mut report = CostReport::new();
        if !include_dependencies {
            report.insert(*id, CostEntry::standalone(own));
            return Ok(report);
        }

        let graph = ProvenanceIndex::build(snapshot.records()).dependency_graph();
        graph.detect_cycle_from(*id)?;

        let by_id: HashMap<ArtifactId, &ArtifactRecord> =
            snapshot.records().map(|r| (r.id(), r)).collect();
        let dependencies: Vec<&ArtifactRecord> = graph
            .get_all_dependencies(id)
            .iter()
            .filter_map(|dep| by_id.get(dep).copied())
            .collect();

        let dependency_costs =
            try_join_all(dependencies.iter().map(|record| self.own_cost(record))).await?;

        let mut total = own;
        for (record, cost) in dependencies.iter().zip(dependency_costs) {
            total += cost;
            report.insert(record.id(), CostEntry::standalone(cost));
        }
        report.insert(
            *id,
            CostEntry {
                total_cost: total,
                standalone_cost: Some(own),
            },
        );

        debug!(dependencies = dependencies.len(), total, "Cost computed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceProfile, StaticSourceResolver};
    use trust_registry_core::{Artifact, DeclaredLink, LinkOrigin, Relationship, SourceMetadata};
    use trust_registry_db::InMemoryArtifactRepository;

    const MIB: u64 = 1024 * 1024;

    async fn insert(
        repository: &InMemoryArtifactRepository,
        artifact_type: ArtifactType,
        url: &str,
        source: SourceMetadata,
    ) -> ArtifactId {
        let record = ArtifactRecord::new(Artifact::new(artifact_type, url).unwrap(), source);
        let id = record.id();
        repository.create(record).await.unwrap();
        id
    }

    fn base_model(url: &str) -> DeclaredLink {
        DeclaredLink::new(url, Relationship::BaseModel, LinkOrigin::CardData)
    }

    fn service(repository: Arc<InMemoryArtifactRepository>, resolver: StaticSourceResolver) -> DefaultCostService {
        DefaultCostService::new(repository, Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_standalone_cost() {
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let id = insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/gpt2",
            SourceMetadata::default().with_size_bytes(512 * MIB),
        )
        .await;

        let service = service(repository, StaticSourceResolver::new());
        let report = service.cost(ArtifactType::Model, &id, false).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.get(&id), Some(&CostEntry::standalone(512.0)));

        // Without dependencies both modes agree on the artifact's own cost
        let inclusive = service.cost(ArtifactType::Model, &id, true).await.unwrap();
        assert_eq!(inclusive.len(), 1);
        assert_eq!(inclusive.get(&id).unwrap().standalone_cost, Some(512.0));
        assert_eq!(inclusive.get(&id).unwrap().total_cost, 512.0);
    }

    #[tokio::test]
    async fn test_dependency_inclusive_cost() {
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let base = insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/acme/base",
            SourceMetadata::default().with_size_bytes(100 * MIB),
        )
        .await;
        let code = insert(
            &repository,
            ArtifactType::Code,
            "https://github.com/acme/trainer",
            SourceMetadata::default().with_size_bytes(5 * MIB),
        )
        .await;
        let dataset = insert(
            &repository,
            ArtifactType::Dataset,
            "https://huggingface.co/datasets/acme/corpus",
            SourceMetadata::default().with_size_bytes(1000 * MIB),
        )
        .await;
        let tuned = insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/acme/tuned",
            SourceMetadata::default()
                .with_size_bytes(50 * MIB)
                .with_link(base_model("acme/base"))
                .with_link(DeclaredLink::new(
                    "https://github.com/acme/trainer",
                    Relationship::CodeRepository,
                    LinkOrigin::ModelCard,
                ))
                .with_link(DeclaredLink::new(
                    "acme/corpus",
                    Relationship::TrainingDataset,
                    LinkOrigin::CardData,
                )),
        )
        .await;

        let service = service(repository, StaticSourceResolver::new());
        let report = service.cost(ArtifactType::Model, &tuned, true).await.unwrap();

        // Training datasets are provenance, not dependencies
        assert_eq!(report.len(), 3);
        assert!(report.get(&dataset).is_none());
        assert_eq!(report.get(&base), Some(&CostEntry::standalone(100.0)));
        assert_eq!(report.get(&code), Some(&CostEntry::standalone(5.0)));

        let root = report.get(&tuned).unwrap();
        assert_eq!(root.standalone_cost, Some(50.0));
        assert_eq!(root.total_cost, 155.0);
    }

    #[tokio::test]
    async fn test_cycle_is_structural_error() {
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let a = insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/acme/a",
            SourceMetadata::default()
                .with_size_bytes(MIB)
                .with_link(base_model("acme/b")),
        )
        .await;
        insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/acme/b",
            SourceMetadata::default()
                .with_size_bytes(MIB)
                .with_link(base_model("acme/a")),
        )
        .await;

        let service = service(repository, StaticSourceResolver::new());
        assert!(matches!(
            service.cost(ArtifactType::Model, &a, true).await,
            Err(ServiceError::Structural(_))
        ));
        // The standalone figure does not walk the graph
        assert!(service.cost(ArtifactType::Model, &a, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_unrecorded_size_is_resolved() {
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let id = insert(
            &repository,
            ArtifactType::Model,
            "https://huggingface.co/gpt2",
            SourceMetadata::default(),
        )
        .await;

        let resolver = StaticSourceResolver::new().with_profile(
            "https://huggingface.co/gpt2",
            SourceProfile {
                size_bytes: Some(2 * MIB),
                ..Default::default()
            },
        );
        let report = service(repository.clone(), resolver)
            .cost(ArtifactType::Model, &id, false)
            .await
            .unwrap();
        assert_eq!(report.get(&id).unwrap().total_cost, 2.0);

        let unreachable = service(
            repository,
            StaticSourceResolver::new().with_unreachable("https://huggingface.co/gpt2"),
        );
        assert!(matches!(
            unreachable.cost(ArtifactType::Model, &id, false).await,
            Err(ServiceError::UpstreamResolution(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let service = service(Arc::new(InMemoryArtifactRepository::new()), StaticSourceResolver::new());
        assert!(matches!(
            service.cost(ArtifactType::Model, &ArtifactId::new(), false).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
