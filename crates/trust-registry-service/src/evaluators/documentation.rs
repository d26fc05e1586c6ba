//! Model card signals: reproducibility, correctness and performance claims

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use trust_registry_core::MetricKind;

use super::{EvaluationContext, EvaluationError, MetricEvaluator, MetricValue};

static USAGE_SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)from_pretrained\(|pipeline\(|```\s*(python|py)\b")
        .expect("Failed to compile usage snippet pattern")
});

static NUMERIC_BENCHMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(accuracy|acc|f1|bleu|rouge(-\w+)?|perplexity|ppl|wer|exact[ _]match|mmlu|hellaswag|precision|recall)\b[^\n]{0,40}?\d+(\.\d+)?",
    )
    .expect("Failed to compile benchmark pattern")
});

static EVALUATION_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(evaluat\w*|benchmark\w*)\b").expect("Failed to compile evaluation pattern")
});

static PERFORMANCE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(accuracy|performance|outperform\w*|state[- ]of[- ]the[- ]art|sota|results?)\b")
        .expect("Failed to compile performance pattern")
});

static NAMED_EVALUATION_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(test|dev|validation|held[- ]out|eval(uation)?)[ -]?(set|split)\b|\b(glue|superglue|squad|mmlu|hellaswag|imagenet|wikitext|coco|librispeech|truthfulqa|gsm8k|humaneval)\b",
    )
    .expect("Failed to compile evaluation set pattern")
});

static PUBLISHED_EVIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)arxiv\.org|doi\.org|openreview\.net|aclanthology\.org|paperswithcode\.com|\bleaderboard\b")
        .expect("Failed to compile evidence pattern")
});

static TRAINING_SETUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(learning[ _]rate|batch[ _]size|optimizer|epochs?|warmup)\b")
        .expect("Failed to compile training setup pattern")
});

static TRAINING_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(trained|training|fine-?tun\w*)\b").expect("Failed to compile training pattern")
});

/// Whether the published material lets someone run the model
pub struct ReproducibilityEvaluator;

#[async_trait]
impl MetricEvaluator for ReproducibilityEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::Reproducibility
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        Ok(MetricValue::Score(reproducibility_score(
            profile.readme.as_deref(),
            &profile.files,
        )))
    }
}

pub(crate) fn reproducibility_score(readme: Option<&str>, files: &[String]) -> f64 {
    let has_usage = readme.is_some_and(|text| USAGE_SNIPPET.is_match(text));
    let ships_code = files.iter().any(|f| f.ends_with(".py"));

    if has_usage || ships_code {
        1.0
    } else if !files.is_empty() {
        0.5
    } else {
        0.0
    }
}

/// Evidence that the model's quality was measured
pub struct CorrectnessEvaluator;

#[async_trait]
impl MetricEvaluator for CorrectnessEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::Correctness
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        Ok(MetricValue::Score(correctness_score(
            profile.has_structured_evaluation,
            profile.readme.as_deref(),
        )))
    }
}

pub(crate) fn correctness_score(has_structured_evaluation: bool, readme: Option<&str>) -> f64 {
    if has_structured_evaluation {
        return 1.0;
    }
    match readme {
        Some(text) if NUMERIC_BENCHMARK.is_match(text) => 0.7,
        Some(text) if EVALUATION_MENTION.is_match(text) => 0.3,
        _ => 0.0,
    }
}

/// How well the model card backs up the performance it claims
pub struct PerformanceClaimsEvaluator;

#[async_trait]
impl MetricEvaluator for PerformanceClaimsEvaluator {
    fn kind(&self) -> MetricKind {
        MetricKind::PerformanceClaims
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<MetricValue, EvaluationError> {
        let profile = ctx.profile().await?;
        Ok(MetricValue::Score(performance_claims_score(
            profile.readme.as_deref(),
            profile.has_structured_evaluation,
        )))
    }
}

/// Weighted rubric over the model card
///
/// Presence and detail of claims weigh 0.3 each; supporting evidence and
/// independent confirmation weigh 0.2 each.
pub(crate) fn performance_claims_score(readme: Option<&str>, has_structured_evaluation: bool) -> f64 {
    let text = readme.unwrap_or_default();
    let benchmarks = NUMERIC_BENCHMARK.find_iter(text).count();
    let mentions = PERFORMANCE_MENTION.is_match(text) || EVALUATION_MENTION.is_match(text);
    let published = PUBLISHED_EVIDENCE.is_match(text);

    let presence: f64 = match benchmarks {
        0 if mentions => 0.5,
        0 => 0.0,
        1 => 0.8,
        _ => 1.0,
    };

    let detail = if benchmarks > 0 && NAMED_EVALUATION_SET.is_match(text) {
        1.0
    } else if benchmarks > 0 {
        0.6
    } else if mentions {
        0.2
    } else {
        0.0
    };

    let evidence = if published {
        1.0
    } else if TRAINING_SETUP.is_match(text) {
        0.7
    } else if TRAINING_MENTION.is_match(text) {
        0.4
    } else {
        0.0
    };

    let confirmation = if has_structured_evaluation {
        1.0
    } else if published {
        0.6
    } else if benchmarks > 0 {
        0.3
    } else {
        0.0
    };

    (0.3 * presence + 0.3 * detail + 0.2 * evidence + 0.2 * confirmation).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::source::SourceProfile;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_reproducibility_levels() {
        let card = "```python\nfrom transformers import AutoModel\nmodel = AutoModel.from_pretrained(\"gpt2\")\n```";
        assert_eq!(reproducibility_score(Some(card), &[]), 1.0);
        assert_eq!(reproducibility_score(None, &files(&["train.py"])), 1.0);
        assert_eq!(reproducibility_score(Some("A model."), &files(&["model.bin"])), 0.5);
        assert_eq!(reproducibility_score(Some("A model."), &[]), 0.0);
        assert_eq!(reproducibility_score(None, &[]), 0.0);
    }

    #[test]
    fn test_correctness_levels() {
        assert_eq!(correctness_score(true, None), 1.0);
        assert_eq!(
            correctness_score(false, Some("| Task | Score |\n| MNLI accuracy | 84.2 |")),
            0.7
        );
        assert_eq!(correctness_score(false, Some("Perplexity on WikiText: 29.41")), 0.7);
        assert_eq!(
            correctness_score(false, Some("We evaluated the model on internal data.")),
            0.3
        );
        assert_eq!(correctness_score(false, Some("Just weights.")), 0.0);
        assert_eq!(correctness_score(false, None), 0.0);
    }

    #[test]
    fn test_performance_claims_rubric() {
        assert_eq!(performance_claims_score(None, false), 0.0);
        assert_eq!(performance_claims_score(Some("Just weights."), false), 0.0);

        // Vague claim only: presence 0.5, detail 0.2
        let vague = performance_claims_score(Some("Strong performance on many tasks."), false);
        assert!((vague - 0.21).abs() < 1e-9);

        // One number on a named split, training setup described
        let measured = performance_claims_score(
            Some("Accuracy of 91.2 on the GLUE test set. Trained for 3 epochs."),
            false,
        );
        // 0.3 * 0.8 + 0.3 * 1.0 + 0.2 * 0.7 + 0.2 * 0.3
        assert!((measured - 0.74).abs() < 1e-9);

        let card = "| MMLU | 71.3 |\n| HellaSwag accuracy | 84.0 |\nSee https://arxiv.org/abs/2401.00001";
        assert!((performance_claims_score(Some(card), true) - 1.0).abs() < 1e-9);
        assert!(performance_claims_score(Some(card), false) < 1.0);
    }

    #[tokio::test]
    async fn test_evaluators_read_profile() {
        let ctx = context_with(SourceProfile {
            readme: Some("Use `pipeline(\"text-generation\")`. Benchmark: BLEU 31.5".to_string()),
            files: files(&["config.json"]),
            ..Default::default()
        });

        assert_eq!(score(ReproducibilityEvaluator.evaluate(&ctx).await.unwrap()), 1.0);
        assert_eq!(score(CorrectnessEvaluator.evaluate(&ctx).await.unwrap()), 0.7);
        assert!(score(PerformanceClaimsEvaluator.evaluate(&ctx).await.unwrap()) > 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_source_fails() {
        let ctx = unreachable_context();
        assert!(matches!(
            CorrectnessEvaluator.evaluate(&ctx).await,
            Err(EvaluationError::Source(_))
        ));
        assert!(matches!(
            PerformanceClaimsEvaluator.evaluate(&ctx).await,
            Err(EvaluationError::Source(_))
        ));
    }
}
