//! License metric

use async_trait::async_trait;
use trust_registry_core::{license_score, MetricKind};

use super::{EvaluationContext, EvaluationError, MetricEvaluator, MetricValue};

/// Scores the declared license by how freely it permits reuse
///
/// The license recorded at ingest time wins; the source is only consulted
/// when nothing was recorded.
pub struct LicenseEvaluator;

#[async_trait]
impl MetricEvaluator for LicenseEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::License
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        if let Some(license) = ctx.record().source.license.as_deref() {
            return Ok(MetricValue::Score(license_score(Some(license))));
        }
        let profile = ctx.profile().await?;
        Ok(MetricValue::Score(license_score(profile.license.as_deref())))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::source::{SourceProfile, StaticSourceResolver};
    use std::sync::Arc;
    use trust_registry_core::SourceMetadata;

    #[tokio::test]
    async fn test_stored_license_skips_resolution() {
        let resolver = Arc::new(StaticSourceResolver::new());
        let ctx = EvaluationContext::new(
            model_record(SourceMetadata::default().with_license("GPL-3.0")),
            resolver.clone(),
        )
        .unwrap();

        assert_eq!(score(LicenseEvaluator.evaluate(&ctx).await.unwrap()), 0.7);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolved_license() {
        let ctx = context_with(SourceProfile {
            license: Some("mit".to_string()),
            ..Default::default()
        });
        assert_eq!(score(LicenseEvaluator.evaluate(&ctx).await.unwrap()), 1.0);

        let ctx = context_with(SourceProfile::default());
        assert_eq!(score(LicenseEvaluator.evaluate(&ctx).await.unwrap()), 0.0);
    }
}
