//! Metric evaluators
//!
//! Each evaluator scores one quality dimension of an artifact. Evaluators
//! share an [`EvaluationContext`] that resolves the artifact's upstream
//! profile, and the profiles of its linked training dataset and code
//! repository, at most once per request. They are driven concurrently by
//! an [`EvaluatorRunner`] that bounds each one with its own timeout.
//!
//! A failing or timed-out evaluator never fails the rating: its score
//! becomes the `-1` sentinel.

mod activity;
mod documentation;
mod license;
mod linked;
mod size;
mod tree;

pub use activity::{BusFactorEvaluator, RampUpEvaluator, ResponsivenessEvaluator};
pub use documentation::{CorrectnessEvaluator, PerformanceClaimsEvaluator, ReproducibilityEvaluator};
pub use license::LicenseEvaluator;
pub use linked::{
    CodeQualityEvaluator, DatasetAndCodeEvaluator, DatasetQualityEvaluator, ReviewednessEvaluator,
};
pub use size::SizeEvaluator;
pub use tree::TreeScoreEvaluator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use trust_registry_core::{
    ArtifactRecord, ArtifactType, DeclaredLink, MetricKind, Relationship, SizeScore,
    SourceLocator, NOT_APPLICABLE,
};

use crate::source::{SourceError, SourceProfile, SourceResolver};
use crate::stats::{record_evaluation, EvaluationOutcome};

/// Why an evaluator produced no score
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("missing data: {0}")]
    MissingData(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Evaluator output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Score(f64),
    Platforms(SizeScore),
}

impl MetricValue {
    /// Sentinel value of the right shape for `kind`
    pub fn not_applicable(kind: MetricKind) -> Self {
        match kind {
            MetricKind::SizeScore => Self::Platforms(SizeScore::not_applicable()),
            _ => Self::Score(NOT_APPLICABLE),
        }
    }

    /// Scalar used by the net score (size contributes its platform mean)
    pub fn scalar(&self) -> f64 {
        match self {
            Self::Score(score) => *score,
            Self::Platforms(sizes) => sizes.mean().unwrap_or(NOT_APPLICABLE),
        }
    }

    fn clamped(self) -> Self {
        match self {
            Self::Score(score) if score == NOT_APPLICABLE => self,
            Self::Score(score) if score.is_finite() => Self::Score(score.clamp(0.0, 1.0)),
            Self::Score(_) => Self::Score(NOT_APPLICABLE),
            platforms => platforms,
        }
    }
}

type ResolvedProfile = OnceCell<Result<Arc<SourceProfile>, SourceError>>;

/// Per-request inputs shared by every evaluator
pub struct EvaluationContext {
    record: ArtifactRecord,
    locator: SourceLocator,
    resolver: Arc<dyn SourceResolver>,
    profile: ResolvedProfile,
    dataset: ResolvedProfile,
    code: ResolvedProfile,
    /// Registered base models, nearest first
    ancestors: Vec<ArtifactRecord>,
    now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(
        record: ArtifactRecord,
        resolver: Arc<dyn SourceResolver>,
    ) -> trust_registry_core::Result<Self> {
        let locator = SourceLocator::parse(&record.artifact.source_url)?;
        Ok(Self {
            record,
            locator,
            resolver,
            profile: OnceCell::new(),
            dataset: OnceCell::new(),
            code: OnceCell::new(),
            ancestors: Vec::new(),
            now: Utc::now(),
        })
    }

    /// Attach the registered base models the artifact derives from
    pub fn with_ancestors(mut self, ancestors: Vec<ArtifactRecord>) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Fix the clock used by recency-based metrics
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn record(&self) -> &ArtifactRecord {
        &self.record
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn ancestors(&self) -> &[ArtifactRecord] {
        &self.ancestors
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn SourceResolver> {
        &self.resolver
    }

    /// Upstream profile, fetched on first use
    pub async fn profile(&self) -> Result<Arc<SourceProfile>, EvaluationError> {
        self.profile
            .get_or_init(|| async {
                debug!(source = %self.locator.canonical_url(), "Resolving source profile");
                self.resolver.resolve(&self.locator).await.map(Arc::new)
            })
            .await
            .clone()
            .map_err(EvaluationError::from)
    }

    /// Profile of the declared training dataset; `None` when none is declared
    pub async fn dataset_profile(&self) -> Result<Option<Arc<SourceProfile>>, EvaluationError> {
        self.linked_profile(&self.dataset, Relationship::TrainingDataset).await
    }

    /// Profile of the declared code repository; `None` when none is declared
    pub async fn code_profile(&self) -> Result<Option<Arc<SourceProfile>>, EvaluationError> {
        self.linked_profile(&self.code, Relationship::CodeRepository).await
    }

    /// Links recorded at ingest take precedence over the live profile
    async fn declared_link(&self, relationship: Relationship) -> Result<Option<DeclaredLink>, EvaluationError> {
        let links = if self.record.source.links.is_empty() {
            self.profile().await?.links.clone()
        } else {
            self.record.source.links.clone()
        };
        Ok(links.into_iter().find(|link| link.relationship == relationship))
    }

    async fn linked_profile(
        &self,
        cell: &ResolvedProfile,
        relationship: Relationship,
    ) -> Result<Option<Arc<SourceProfile>>, EvaluationError> {
        let Some(link) = self.declared_link(relationship).await? else {
            return Ok(None);
        };

        cell.get_or_init(|| async {
            let locator = SourceLocator::from_reference(&link.source_url, relationship.target_type())
                .map_err(|e| SourceError::Malformed(e.to_string()))?;
            debug!(
                source = %locator.canonical_url(),
                relationship = relationship.label(),
                "Resolving linked source"
            );
            self.resolver.resolve(&locator).await.map(Arc::new)
        })
        .await
        .clone()
        .map(Some)
        .map_err(EvaluationError::from)
    }
}

/// A single quality metric
#[async_trait]
pub trait MetricEvaluator: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// Ratings are defined for models; other types get the sentinel
    fn applies_to(&self, artifact_type: ArtifactType) -> bool {
        artifact_type == ArtifactType::Model
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError>;
}

/// Evaluators that only read the artifact's own and linked sources
fn source_evaluators() -> Vec<Arc<dyn MetricEvaluator>> {
    vec![
        Arc::new(RampUpEvaluator),
        Arc::new(BusFactorEvaluator),
        Arc::new(ReproducibilityEvaluator),
        Arc::new(CorrectnessEvaluator),
        Arc::new(ResponsivenessEvaluator),
        Arc::new(LicenseEvaluator),
        Arc::new(SizeEvaluator),
        Arc::new(PerformanceClaimsEvaluator),
        Arc::new(DatasetAndCodeEvaluator),
        Arc::new(DatasetQualityEvaluator),
        Arc::new(CodeQualityEvaluator),
        Arc::new(ReviewednessEvaluator),
    ]
}

/// The fixed evaluator set, one per metric
///
/// Tree score rates every ancestor with the source evaluators; each of
/// those ancestor metrics gets half of `timeout`.
pub fn default_evaluators(timeout: Duration) -> Vec<Arc<dyn MetricEvaluator>> {
    let ancestor_runner = EvaluatorRunner::new(source_evaluators(), timeout / 2);
    let mut evaluators = source_evaluators();
    evaluators.push(Arc::new(TreeScoreEvaluator::new(ancestor_runner)));
    evaluators
}

/// Result of one evaluator run
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutcome {
    pub kind: MetricKind,
    pub value: MetricValue,
    /// Wall time in seconds
    pub latency: f64,
    pub error: Option<EvaluationError>,
}

/// Runs evaluators concurrently with an individual timeout each
#[derive(Clone)]
pub struct EvaluatorRunner {
    evaluators: Vec<Arc<dyn MetricEvaluator>>,
    timeout: Duration,
}

impl EvaluatorRunner {
    pub fn new(evaluators: Vec<Arc<dyn MetricEvaluator>>, timeout: Duration) -> Self {
        Self { evaluators, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every evaluator; outcomes come back in evaluator order
    pub async fn run(&self, ctx: &EvaluationContext) -> Vec<MetricOutcome> {
        join_all(self.evaluators.iter().map(|e| self.run_one(e.as_ref(), ctx))).await
    }

    async fn run_one(&self, evaluator: &dyn MetricEvaluator, ctx: &EvaluationContext) -> MetricOutcome {
        let kind = evaluator.kind();
        let started = Instant::now();

        if !evaluator.applies_to(ctx.record().artifact_type()) {
            record_evaluation(kind, EvaluationOutcome::NotApplicable, 0.0);
            return MetricOutcome {
                kind,
                value: MetricValue::not_applicable(kind),
                latency: 0.0,
                error: None,
            };
        }

        let result = match tokio::time::timeout(self.timeout, evaluator.evaluate(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(EvaluationError::TimedOut(self.timeout)),
        };
        let latency = started.elapsed().as_secs_f64();

        match result {
            Ok(value) => {
                let value = value.clamped();
                let outcome = if value.scalar() == NOT_APPLICABLE {
                    EvaluationOutcome::NotApplicable
                } else {
                    EvaluationOutcome::Scored
                };
                record_evaluation(kind, outcome, latency);
                MetricOutcome {
                    kind,
                    value,
                    latency,
                    error: None,
                }
            }
            Err(error) => {
                let outcome = match error {
                    EvaluationError::TimedOut(_) => EvaluationOutcome::TimedOut,
                    _ => EvaluationOutcome::Failed,
                };
                record_evaluation(kind, outcome, latency);
                warn!(metric = %kind, error = %error, "Metric evaluation failed");
                MetricOutcome {
                    kind,
                    value: MetricValue::not_applicable(kind),
                    latency,
                    error: Some(error),
                }
            }
        }
    }
}
