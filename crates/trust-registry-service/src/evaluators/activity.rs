//! Adoption and maintenance signals: ramp-up time, bus factor, responsiveness

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use trust_registry_core::MetricKind;

use super::{EvaluationContext, EvaluationError, MetricEvaluator, MetricValue};

/// Contributor count at which the breadth half of the bus factor saturates
const BUS_FACTOR_FULL_TEAM: f64 = 5.0;

/// Recency thresholds in days and their scores
const RESPONSIVENESS_STEPS: [(i64, f64); 4] = [(30, 1.0), (90, 0.8), (365, 0.5), (730, 0.25)];

/// Adoption measured by download count on a log scale
pub struct RampUpEvaluator;

#[async_trait]
impl MetricEvaluator for RampUpEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::RampUpTime
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        let downloads = profile
            .downloads
            .ok_or_else(|| EvaluationError::MissingData("download count".to_string()))?;
        Ok(MetricValue::Score(ramp_up_score(downloads)))
    }
}

pub(crate) fn ramp_up_score(downloads: u64) -> f64 {
    if downloads == 0 {
        return 0.0;
    }
    ((downloads as f64).log10() / 10.0).clamp(0.0, 1.0)
}

/// How evenly commits are spread across how many authors
pub struct BusFactorEvaluator;

#[async_trait]
impl MetricEvaluator for BusFactorEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::BusFactor
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        if profile.contributions.is_empty() {
            return Err(EvaluationError::MissingData("commit history".to_string()));
        }
        let commits: Vec<u64> = profile.contributions.iter().map(|c| c.commits).collect();
        Ok(MetricValue::Score(bus_factor_score(&commits)))
    }
}

/// Half evenness (normalized Shannon entropy), half team breadth
pub(crate) fn bus_factor_score(commits: &[u64]) -> f64 {
    let counts: Vec<f64> = commits.iter().filter(|c| **c > 0).map(|c| *c as f64).collect();
    let n = counts.len();
    if n <= 1 {
        return 0.0;
    }

    let total: f64 = counts.iter().sum();
    let entropy: f64 = counts
        .iter()
        .map(|c| {
            let share = c / total;
            -share * share.log2()
        })
        .sum();
    let evenness = entropy / (n as f64).log2();
    let breadth = (n as f64 / BUS_FACTOR_FULL_TEAM).min(1.0);

    (0.5 * evenness + 0.5 * breadth).clamp(0.0, 1.0)
}

/// Recency of the last upstream modification
pub struct ResponsivenessEvaluator;

#[async_trait]
impl MetricEvaluator for ResponsivenessEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::Responsiveness
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        let last_modified = profile
            .last_modified
            .ok_or_else(|| EvaluationError::MissingData("last modification time".to_string()))?;
        Ok(MetricValue::Score(responsiveness_score(ctx.now() - last_modified)))
    }
}

pub(crate) fn responsiveness_score(age: ChronoDuration) -> f64 {
    // Clock skew can make upstream timestamps land slightly in the future
    let days = age.num_days().max(0);
    RESPONSIVENESS_STEPS
        .iter()
        .find(|(limit, _)| days <= *limit)
        .map(|(_, score)| *score)
        .unwrap_or(0.0)
}
