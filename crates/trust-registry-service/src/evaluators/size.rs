//! Size fitness per deployment platform

use async_trait::async_trait;
use trust_registry_core::{MetricKind, SizeScore};

use super::{EvaluationContext, EvaluationError, MetricEvaluator, MetricValue};

/// Scores the storage footprint against each platform's capacity
pub struct SizeEvaluator;

#[async_trait]
impl MetricEvaluator for SizeEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::SizeScore
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let size_bytes = match ctx.record().source.size_bytes {
            Some(size) => size,
            None => ctx
                .profile()
                .await?
                .size_bytes
                .ok_or_else(|| EvaluationError::MissingData("storage footprint".to_string()))?,
        };
        Ok(MetricValue::Platforms(SizeScore::from_size_bytes(size_bytes)))
    }
}
