//! Tree score: how trustworthy the models this one was built on are

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::debug;
use trust_registry_core::{aggregate_net_score, ArtifactRecord, MetricKind, NOT_APPLICABLE};

use super::{EvaluationContext, EvaluationError, EvaluatorRunner, MetricEvaluator, MetricValue};

/// Mean net score of the registered base models the artifact derives from
///
/// Ancestors are rated with the runner's evaluators, which must not include
/// another tree score. A model with no registered ancestors is not
/// applicable.
pub struct TreeScoreEvaluator {
    runner: EvaluatorRunner,
}

impl TreeScoreEvaluator {
    pub fn new(runner: EvaluatorRunner) -> Self {
        Self { runner }
    }

    /// Net score of one ancestor; `None` when none of its metrics applied
    async fn ancestor_net_score(&self, ancestor: &ArtifactRecord, ctx: &EvaluationContext) -> Option<f64> {
        let ancestor_ctx = EvaluationContext::new(ancestor.clone(), ctx.resolver().clone())
            .ok()?
            .with_now(ctx.now());
        let outcomes = self.runner.run(&ancestor_ctx).await;

        let scores: BTreeMap<MetricKind, f64> =
            outcomes.iter().map(|o| (o.kind, o.value.scalar())).collect();
        let net = aggregate_net_score(&scores);
        debug!(ancestor = %ancestor.artifact.name, net_score = net.value, "Ancestor rated");
        (!net.applied_weights.is_empty()).then_some(net.value)
    }
}

#[async_trait]
impl MetricEvaluator for TreeScoreEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::TreeScore
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        if ctx.ancestors().is_empty() {
            return Ok(MetricValue::Score(NOT_APPLICABLE));
        }

        let rated: Vec<f64> = join_all(ctx.ancestors().iter().map(|a| self.ancestor_net_score(a, ctx)))
            .await
            .into_iter()
            .flatten()
            .collect();
        if rated.is_empty() {
            return Err(EvaluationError::MissingData("no ancestor could be rated".to_string()));
        }
        Ok(MetricValue::Score(rated.iter().sum::<f64>() / rated.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::LicenseEvaluator;
    use super::*;
    use crate::source::{SourceProfile, StaticSourceResolver};
    use std::sync::Arc;
    use std::time::Duration;
    use trust_registry_core::{Artifact, ArtifactType, SourceMetadata};

    fn ancestor(url: &str, license: Option<&str>) -> ArtifactRecord {
        ArtifactRecord::new(
            Artifact::new(ArtifactType::Model, url).unwrap(),
            SourceMetadata {
                license: license.map(str::to_string),
                ..Default::default()
            },
        )
    }

    fn license_only() -> TreeScoreEvaluator {
        TreeScoreEvaluator::new(EvaluatorRunner::new(
            vec![Arc::new(LicenseEvaluator)],
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_no_ancestors_is_not_applicable() {
        let ctx = context_with(SourceProfile::default());
        assert_eq!(score(license_only().evaluate(&ctx).await.unwrap()), NOT_APPLICABLE);
    }

    #[tokio::test]
    async fn test_mean_of_ancestor_net_scores() {
        let ctx = context_with(SourceProfile::default()).with_ancestors(vec![
            ancestor("https://huggingface.co/acme/base", Some("mit")),
            ancestor("https://huggingface.co/acme/older", Some("gpl-3.0")),
        ]);

        // Stored licenses need no resolution: 1.0 and 0.7
        let tree = score(license_only().evaluate(&ctx).await.unwrap());
        assert!((tree - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unratable_ancestors_are_skipped() {
        let resolver = StaticSourceResolver::new()
            .with_profile(MODEL_URL, SourceProfile::default())
            .with_unreachable("https://huggingface.co/acme/gone");
        let ctx = EvaluationContext::new(model_record(SourceMetadata::default()), Arc::new(resolver))
            .unwrap()
            .with_ancestors(vec![
                ancestor("https://huggingface.co/acme/gone", None),
                ancestor("https://huggingface.co/acme/base", Some("mit")),
            ]);

        assert_eq!(score(license_only().evaluate(&ctx).await.unwrap()), 1.0);

        let only_gone = ctx.with_ancestors(vec![ancestor("https://huggingface.co/acme/gone", None)]);
        assert!(matches!(
            license_only().evaluate(&only_gone).await,
            Err(EvaluationError::MissingData(_))
        ));
    }
}
