//! Rating service
//!
//! Runs the metric evaluators over one model and folds their scores into
//! the net score. Ratings are computed fresh for every request. The
//! registered base models the model derives from, found by walking
//! `base_model` provenance upwards, are handed to the tree score.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use trust_registry_core::{
    aggregate_net_score, ArtifactId, ArtifactRecord, ArtifactType, Direction, MetricKind,
    ProvenanceIndex, Rating, Relationship, SizeScore, NOT_APPLICABLE,
};
use trust_registry_db::{ArtifactRepository, Snapshot};

use crate::error::{ServiceError, ServiceResult};
use crate::evaluators::{EvaluationContext, EvaluatorRunner, MetricOutcome, MetricValue};
use crate::source::SourceResolver;

/// Trait for model rating
#[async_trait]
pub trait RatingService: Send + Sync {
    /// Rate an artifact; only models can be rated
    async fn rate(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<Rating>;
}

/// Default implementation of RatingService
pub struct DefaultRatingService {
    repository: Arc<dyn ArtifactRepository>,
    resolver: Arc<dyn SourceResolver>,
    runner: EvaluatorRunner,
}

impl DefaultRatingService {
    /// Create a new rating service
    pub fn new(
        repository: Arc<dyn ArtifactRepository>,
        resolver: Arc<dyn SourceResolver>,
        runner: EvaluatorRunner,
    ) -> Self {
        Self {
            repository,
            resolver,
            runner,
        }
    }
}

#[async_trait]
impl RatingService for DefaultRatingService {
    #[instrument(skip(self), fields(artifact_type = %artifact_type, id = %id))]
    async fn rate(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<Rating> {
        if artifact_type != ArtifactType::Model {
            return Err(ServiceError::ValidationFailed(format!(
                "Only models can be rated, got {}",
                artifact_type
            )));
        }

        let started = Instant::now();
        let snapshot = self.repository.snapshot().await?;
        let record = snapshot.require(artifact_type, id)?.clone();
        let ancestors = base_model_ancestors(&snapshot, id);
        debug!(ancestors = ancestors.len(), "Base model ancestry resolved");

        let name = record.artifact.name.clone();
        let category = record.artifact_type().to_string();
        let ctx = EvaluationContext::new(record, self.resolver.clone())?.with_ancestors(ancestors);
        let outcomes = self.runner.run(&ctx).await;

        let rating = assemble_rating(name, category, &outcomes, started.elapsed().as_secs_f64());
        info!(net_score = rating.net_score, "Model rated");
        Ok(rating)
    }
}

/// Registered models reachable through `base_model` links, nearest first
fn base_model_ancestors(snapshot: &Snapshot, id: &ArtifactId) -> Vec<ArtifactRecord> {
    let index = ProvenanceIndex::build(snapshot.records());
    let ancestors = index
        .walk(*id, Direction::Ancestors, |edge| edge.relationship == Relationship::BaseModel)
        .into_iter()
        .filter(|edge| edge.parent != *id)
        .filter_map(|edge| snapshot.get(ArtifactType::Model, &edge.parent))
        .fold(Vec::<ArtifactRecord>::new(), |mut ancestors, record| {
            if !ancestors.iter().any(|a| a.id() == record.id()) {
                ancestors.push(record.clone());
            }
            ancestors
        });
    ancestors
}

/// Build the flat rating document from evaluator outcomes
///
/// `net_score_latency` is the wall time of the whole rating request.
pub fn assemble_rating(
    name: String,
    category: String,
    outcomes: &[MetricOutcome],
    total_latency: f64,
) -> Rating {
    let by_kind: BTreeMap<MetricKind, &MetricOutcome> =
        outcomes.iter().map(|o| (o.kind, o)).collect();

    let scalar = |kind: MetricKind| -> (f64, f64) {
        by_kind
            .get(&kind)
            .map(|o| (o.value.scalar(), o.latency))
            .unwrap_or((NOT_APPLICABLE, 0.0))
    };
    let (size_score, size_score_latency) = match by_kind.get(&MetricKind::SizeScore) {
        Some(MetricOutcome {
            value: MetricValue::Platforms(sizes),
            latency,
            ..
        }) => (*sizes, *latency),
        Some(outcome) => (SizeScore::not_applicable(), outcome.latency),
        None => (SizeScore::not_applicable(), 0.0),
    };

    let (ramp_up_time, ramp_up_time_latency) = scalar(MetricKind::RampUpTime);
    let (bus_factor, bus_factor_latency) = scalar(MetricKind::BusFactor);
    let (reproducibility, reproducibility_latency) = scalar(MetricKind::Reproducibility);
    let (correctness, correctness_latency) = scalar(MetricKind::Correctness);
    let (responsiveness, responsiveness_latency) = scalar(MetricKind::Responsiveness);
    let (license, license_latency) = scalar(MetricKind::License);
    let (performance_claims, performance_claims_latency) = scalar(MetricKind::PerformanceClaims);
    let (dataset_and_code_score, dataset_and_code_score_latency) =
        scalar(MetricKind::DatasetAndCodeScore);
    let (dataset_quality, dataset_quality_latency) = scalar(MetricKind::DatasetQuality);
    let (code_quality, code_quality_latency) = scalar(MetricKind::CodeQuality);
    let (reviewedness, reviewedness_latency) = scalar(MetricKind::Reviewedness);
    let (tree_score, tree_score_latency) = scalar(MetricKind::TreeScore);

    let mut rating = Rating {
        name,
        category,
        net_score: 0.0,
        net_score_latency: total_latency.max(0.0),
        ramp_up_time,
        ramp_up_time_latency,
        bus_factor,
        bus_factor_latency,
        reproducibility,
        reproducibility_latency,
        correctness,
        correctness_latency,
        responsiveness,
        responsiveness_latency,
        license,
        license_latency,
        size_score,
        size_score_latency,
        performance_claims,
        performance_claims_latency,
        dataset_and_code_score,
        dataset_and_code_score_latency,
        dataset_quality,
        dataset_quality_latency,
        code_quality,
        code_quality_latency,
        reviewedness,
        reviewedness_latency,
        tree_score,
        tree_score_latency,
    };
    rating.net_score = aggregate_net_score(&rating.scalar_scores()).value;
    rating
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::default_evaluators;
    use crate::source::{Contribution, SourceProfile, StaticSourceResolver};
    use std::time::Duration;
    use trust_registry_core::{Artifact, DeclaredLink, LinkOrigin, SourceMetadata};
    use trust_registry_db::InMemoryArtifactRepository;

    const GPT2: &str = "https://huggingface.co/openai-community/gpt2";

    fn gpt2_profile() -> SourceProfile {
        SourceProfile {
            license: Some("mit".to_string()),
            size_bytes: Some(548_105_171),
            downloads: Some(10_000_000),
            likes: Some(2000),
            last_modified: Some(chrono::Utc::now() - chrono::Duration::days(45)),
            readme: Some("```python\nfrom transformers import pipeline\n```".to_string()),
            files: vec!["config.json".to_string(), "model.safetensors".to_string()],
            has_structured_evaluation: false,
            contributions: vec![
                Contribution {
                    author: "a".to_string(),
                    commits: 10,
                },
                Contribution {
                    author: "b".to_string(),
                    commits: 10,
                },
            ],
            links: Vec::new(),
            merged_pull_requests: None,
        }
    }

    fn service(repository: Arc<InMemoryArtifactRepository>, resolver: StaticSourceResolver) -> DefaultRatingService {
        let timeout = Duration::from_secs(5);
        DefaultRatingService::new(
            repository,
            Arc::new(resolver),
            EvaluatorRunner::new(default_evaluators(timeout), timeout),
        )
    }

    async fn insert(repository: &InMemoryArtifactRepository, artifact_type: ArtifactType, url: &str, source: SourceMetadata) -> ArtifactId {
        let record = ArtifactRecord::new(Artifact::new(artifact_type, url).unwrap(), source);
        let id = record.id();
        repository.create(record).await.unwrap();
        id
    }

    async fn setup(resolver: StaticSourceResolver, artifact_type: ArtifactType, url: &str) -> (DefaultRatingService, ArtifactId) {
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let id = insert(&repository, artifact_type, url, SourceMetadata::default()).await;
        (service(repository, resolver), id)
    }

    #[tokio::test]
    async fn test_rate_model() {
        let resolver = StaticSourceResolver::new().with_profile(GPT2, gpt2_profile());
        let (service, id) = setup(resolver, ArtifactType::Model, GPT2).await;

        let rating = service.rate(ArtifactType::Model, &id).await.unwrap();
        assert_eq!(rating.name, "gpt2");
        assert_eq!(rating.category, "model");
        assert!((rating.ramp_up_time - 0.7).abs() < 1e-9);
        assert!((rating.bus_factor - 0.7).abs() < 1e-9);
        assert_eq!(rating.reproducibility, 1.0);
        assert_eq!(rating.correctness, 0.0);
        assert_eq!(rating.responsiveness, 0.8);
        assert_eq!(rating.license, 1.0);
        assert_eq!(rating.size_score.raspberry_pi, 0.5);
        assert_eq!(rating.size_score.aws_server, 1.0);
        // No dataset or code declared, nothing to review, no registered base model
        assert_eq!(rating.dataset_quality, 0.0);
        assert_eq!(rating.code_quality, 0.0);
        assert_eq!(rating.dataset_and_code_score, 0.0);
        assert_eq!(rating.reviewedness, NOT_APPLICABLE);
        assert_eq!(rating.tree_score, NOT_APPLICABLE);
        assert!(rating.performance_claims >= 0.0);
        assert!(rating.net_score > 0.0 && rating.net_score <= 1.0);
        assert!(rating.net_score_latency >= rating.license_latency);
    }

    #[tokio::test]
    async fn test_rating_is_deterministic() {
        let resolver = StaticSourceResolver::new().with_profile(GPT2, gpt2_profile());
        let (service, id) = setup(resolver, ArtifactType::Model, GPT2).await;

        let first = service.rate(ArtifactType::Model, &id).await.unwrap();
        let second = service.rate(ArtifactType::Model, &id).await.unwrap();
        assert_eq!(first.net_score, second.net_score);
    }

    #[tokio::test]
    async fn test_unreachable_source_still_rates() {
        let resolver = StaticSourceResolver::new().with_unreachable(GPT2);
        let (service, id) = setup(resolver, ArtifactType::Model, GPT2).await;

        let rating = service.rate(ArtifactType::Model, &id).await.unwrap();
        assert_eq!(rating.ramp_up_time, NOT_APPLICABLE);
        assert_eq!(rating.license, NOT_APPLICABLE);
        assert_eq!(rating.size_score, SizeScore::not_applicable());
        assert_eq!(rating.dataset_and_code_score, NOT_APPLICABLE);
        assert_eq!(rating.net_score, 0.0);
    }

    #[tokio::test]
    async fn test_tree_score_follows_base_models() {
        const BASE: &str = "https://huggingface.co/acme/base";
        const TUNED: &str = "https://huggingface.co/acme/tuned";
        const CORPUS: &str = "https://huggingface.co/datasets/acme/corpus";

        let resolver = StaticSourceResolver::new()
            .with_profile(BASE, gpt2_profile())
            .with_profile(TUNED, gpt2_profile())
            .with_profile(CORPUS, SourceProfile::default());
        let repository = Arc::new(InMemoryArtifactRepository::new());
        let base = insert(&repository, ArtifactType::Model, BASE, SourceMetadata::default()).await;
        insert(&repository, ArtifactType::Dataset, CORPUS, SourceMetadata::default()).await;
        let tuned = insert(
            &repository,
            ArtifactType::Model,
            TUNED,
            SourceMetadata {
                links: vec![
                    DeclaredLink::new("acme/base", Relationship::BaseModel, LinkOrigin::CardData),
                    DeclaredLink::new("acme/corpus", Relationship::TrainingDataset, LinkOrigin::CardData),
                ],
                ..Default::default()
            },
        )
        .await;
        let service = service(repository, resolver);

        let base_rating = service.rate(ArtifactType::Model, &base).await.unwrap();
        assert_eq!(base_rating.tree_score, NOT_APPLICABLE);

        // Only the base model counts; the dataset is not an ancestor model
        let tuned_rating = service.rate(ArtifactType::Model, &tuned).await.unwrap();
        assert!((tuned_rating.tree_score - base_rating.net_score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rate_missing_and_non_model() {
        let (service, _) = setup(
            StaticSourceResolver::new(),
            ArtifactType::Code,
            "https://github.com/psf/requests",
        )
        .await;

        assert!(matches!(
            service.rate(ArtifactType::Model, &ArtifactId::new()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.rate(ArtifactType::Code, &ArtifactId::new()).await,
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_assemble_rating_excludes_sentinels() {
        let outcomes = vec![
            MetricOutcome {
                kind: MetricKind::License,
                value: MetricValue::Score(1.0),
                latency: 0.01,
                error: None,
            },
            MetricOutcome {
                kind: MetricKind::RampUpTime,
                value: MetricValue::Score(NOT_APPLICABLE),
                latency: 0.02,
                error: None,
            },
        ];
        let rating = assemble_rating("m".to_string(), "model".to_string(), &outcomes, 0.05);
        assert_eq!(rating.net_score, 1.0);
        assert_eq!(rating.bus_factor, NOT_APPLICABLE);
        assert_eq!(rating.tree_score, NOT_APPLICABLE);
        assert_eq!(rating.ramp_up_time_latency, 0.02);
        assert_eq!(rating.net_score_latency, 0.05);
    }
}
