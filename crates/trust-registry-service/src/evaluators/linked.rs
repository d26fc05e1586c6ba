//! Signals from the training dataset and code repository a model links to
//!
//! A model that declares no dataset or no code repository scores 0 on the
//! matching quality metric; one whose declared source cannot be resolved
//! gets the sentinel. Reviewedness has nothing to measure without a code
//! repository and is not applicable then.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trust_registry_core::{MetricKind, NOT_APPLICABLE};

use super::{EvaluationContext, EvaluationError, MetricEvaluator, MetricValue};
use crate::source::SourceProfile;

/// Commit count at which the history part of code quality saturates
const CODE_QUALITY_FULL_HISTORY: f64 = 100.0;

/// Author count at which the team part of code quality saturates
const CODE_QUALITY_FULL_TEAM: f64 = 5.0;

/// Documentation, licensing and content of the training dataset
pub struct DatasetQualityEvaluator;

#[async_trait]
impl MetricEvaluator for DatasetQualityEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::DatasetQuality
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        Ok(MetricValue::Score(dataset_quality(ctx).await?))
    }
}

async fn dataset_quality(ctx: &EvaluationContext) -> Result<f64, EvaluationError> {
    Ok(ctx
        .dataset_profile()
        .await?
        .map(|profile| dataset_quality_score(&profile))
        .unwrap_or(0.0))
}

/// One third each for a description, a license and published files
pub(crate) fn dataset_quality_score(dataset: &SourceProfile) -> f64 {
    let described = dataset.readme.as_deref().is_some_and(|text| !text.trim().is_empty());
    let licensed = dataset.license.as_deref().is_some_and(|id| !id.trim().is_empty());
    let has_files = !dataset.files.is_empty();

    [described, licensed, has_files].iter().filter(|present| **present).count() as f64 / 3.0
}

/// History depth, team size and freshness of the code repository
pub struct CodeQualityEvaluator;

#[async_trait]
impl MetricEvaluator for CodeQualityEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::CodeQuality
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        Ok(MetricValue::Score(code_quality(ctx).await?))
    }
}

async fn code_quality(ctx: &EvaluationContext) -> Result<f64, EvaluationError> {
    Ok(ctx
        .code_profile()
        .await?
        .map(|profile| code_quality_score(&profile, ctx.now()))
        .unwrap_or(0.0))
}

pub(crate) fn code_quality_score(code: &SourceProfile, now: DateTime<Utc>) -> f64 {
    let commits: u64 = code.contributions.iter().map(|c| c.commits).sum();
    let history = (commits as f64 / CODE_QUALITY_FULL_HISTORY).min(1.0);
    let team = (code.contributions.len() as f64 / CODE_QUALITY_FULL_TEAM).min(1.0);
    let freshness = match code.last_modified.map(|at| (now - at).num_days()) {
        Some(days) if days < 30 => 1.0,
        Some(days) if days < 365 => 0.5,
        _ => 0.0,
    };

    (history + team + freshness) / 3.0
}

/// Mean of dataset quality and code quality
pub struct DatasetAndCodeEvaluator;

#[async_trait]
impl MetricEvaluator for DatasetAndCodeEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::DatasetAndCodeScore
    }

    /// A side that fails is left out; both failing fails the metric
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let (dataset, code) = futures::join!(dataset_quality(ctx), code_quality(ctx));
        let score = match (dataset, code) {
            (Ok(dataset), Ok(code)) => (dataset + code) / 2.0,
            (Ok(only), Err(_)) | (Err(_), Ok(only)) => only,
            (Err(error), Err(_)) => return Err(error),
        };
        Ok(MetricValue::Score(score))
    }
}

/// Share of the code repository's history that went through merged pull requests
pub struct ReviewednessEvaluator;

#[async_trait]
impl MetricEvaluator for ReviewednessEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::Reviewedness
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let Some(code) = ctx.code_profile().await? else {
            return Ok(MetricValue::Score(NOT_APPLICABLE));
        };
        let merged = code
            .merged_pull_requests
            .ok_or_else(|| EvaluationError::MissingData("merged pull request count".to_string()))?;
        let commits: u64 = code.contributions.iter().map(|c| c.commits).sum();
        Ok(MetricValue::Score(reviewedness_score(merged, commits)))
    }
}

pub(crate) fn reviewedness_score(merged_pull_requests: u64, commits: u64) -> f64 {
    if commits == 0 {
        return 0.0;
    }
    (merged_pull_requests as f64 / commits as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::source::{Contribution, StaticSourceResolver};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use trust_registry_core::{DeclaredLink, LinkOrigin, Relationship, SourceMetadata};

    fn contributions(commits: &[u64]) -> Vec<Contribution> {
        commits
            .iter()
            .enumerate()
            .map(|(i, c)| Contribution {
                author: format!("dev-{}", i),
                commits: *c,
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    /// Model declaring both links, with the linked sources as given
    fn linked_context(dataset: Option<SourceProfile>, code: Option<SourceProfile>) -> EvaluationContext {
        let mut resolver = StaticSourceResolver::new();
        match dataset {
            Some(profile) => resolver = resolver.with_profile(DATASET_URL, profile),
            None => resolver = resolver.with_unreachable(DATASET_URL),
        }
        match code {
            Some(profile) => resolver = resolver.with_profile(CODE_URL, profile),
            None => resolver = resolver.with_unreachable(CODE_URL),
        }
        let record = model_record(SourceMetadata {
            links: vec![
                DeclaredLink::new(DATASET_URL, Relationship::TrainingDataset, LinkOrigin::CardData),
                DeclaredLink::new(CODE_URL, Relationship::CodeRepository, LinkOrigin::ModelCard),
            ],
            ..Default::default()
        });
        EvaluationContext::new(record, Arc::new(resolver)).unwrap().with_now(now())
    }

    fn documented_dataset() -> SourceProfile {
        SourceProfile {
            readme: Some("# Corpus\nCrawled news articles.".to_string()),
            license: Some("cc-by-4.0".to_string()),
            files: vec!["train.parquet".to_string()],
            ..Default::default()
        }
    }

    fn active_repository() -> SourceProfile {
        SourceProfile {
            contributions: contributions(&[60, 30, 10, 5, 5]),
            last_modified: Some(now() - Duration::days(3)),
            merged_pull_requests: Some(55),
            ..Default::default()
        }
    }

    #[test]
    fn test_dataset_quality_counts_present_signals() {
        assert_eq!(dataset_quality_score(&documented_dataset()), 1.0);
        let bare = SourceProfile {
            license: Some("mit".to_string()),
            readme: Some("   ".to_string()),
            ..Default::default()
        };
        assert!((dataset_quality_score(&bare) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(dataset_quality_score(&SourceProfile::default()), 0.0);
    }

    #[test]
    fn test_code_quality_parts() {
        assert!((code_quality_score(&active_repository(), now()) - 1.0).abs() < 1e-9);

        // 20 commits, 2 authors, touched 200 days ago
        let small = SourceProfile {
            contributions: contributions(&[15, 5]),
            last_modified: Some(now() - Duration::days(200)),
            ..Default::default()
        };
        let expected = (0.2 + 0.4 + 0.5) / 3.0;
        assert!((code_quality_score(&small, now()) - expected).abs() < 1e-9);

        assert_eq!(code_quality_score(&SourceProfile::default(), now()), 0.0);
    }

    #[test]
    fn test_reviewedness_ratio() {
        assert_eq!(reviewedness_score(0, 0), 0.0);
        assert!((reviewedness_score(25, 100) - 0.25).abs() < 1e-9);
        assert_eq!(reviewedness_score(300, 100), 1.0);
    }

    #[tokio::test]
    async fn test_linked_sources_are_scored() {
        let ctx = linked_context(Some(documented_dataset()), Some(active_repository()));

        assert_eq!(score(DatasetQualityEvaluator.evaluate(&ctx).await.unwrap()), 1.0);
        assert!((score(CodeQualityEvaluator.evaluate(&ctx).await.unwrap()) - 1.0).abs() < 1e-9);
        assert!((score(DatasetAndCodeEvaluator.evaluate(&ctx).await.unwrap()) - 1.0).abs() < 1e-9);
        assert!((score(ReviewednessEvaluator.evaluate(&ctx).await.unwrap()) - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_undeclared_sources() {
        let ctx = context_with(SourceProfile::default());

        assert_eq!(score(DatasetQualityEvaluator.evaluate(&ctx).await.unwrap()), 0.0);
        assert_eq!(score(CodeQualityEvaluator.evaluate(&ctx).await.unwrap()), 0.0);
        assert_eq!(score(DatasetAndCodeEvaluator.evaluate(&ctx).await.unwrap()), 0.0);
        assert_eq!(score(ReviewednessEvaluator.evaluate(&ctx).await.unwrap()), NOT_APPLICABLE);
    }

    #[tokio::test]
    async fn test_unresolvable_sources() {
        let ctx = linked_context(Some(documented_dataset()), None);

        assert!(matches!(
            CodeQualityEvaluator.evaluate(&ctx).await,
            Err(EvaluationError::Source(_))
        ));
        assert!(matches!(
            ReviewednessEvaluator.evaluate(&ctx).await,
            Err(EvaluationError::Source(_))
        ));
        // The dataset half still counts
        assert_eq!(score(DatasetAndCodeEvaluator.evaluate(&ctx).await.unwrap()), 1.0);

        let ctx = linked_context(None, None);
        assert!(DatasetAndCodeEvaluator.evaluate(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_reviewedness_needs_pull_request_count() {
        let repository = SourceProfile {
            merged_pull_requests: None,
            ..active_repository()
        };
        let ctx = linked_context(Some(documented_dataset()), Some(repository));
        assert!(matches!(
            ReviewednessEvaluator.evaluate(&ctx).await,
            Err(EvaluationError::MissingData(_))
        ));
    }
}
