//! Prometheus counters for service operations
//!
//! Registered in the process-wide default registry so they show up in the
//! `/metrics` exposition next to the HTTP counters.

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};
use trust_registry_core::MetricKind;

/// Metric evaluator outcomes
pub static EVALUATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trust_registry_evaluations_total",
        "Metric evaluator runs by metric and outcome",
        &["metric", "outcome"]
    )
    .expect("Failed to create evaluations counter")
});

/// Metric evaluator latency
pub static EVALUATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "trust_registry_evaluation_duration_seconds",
        "Metric evaluator latency in seconds",
        &["metric"],
        vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create evaluation duration histogram")
});

/// Artifact catalogue operations
pub static ARTIFACT_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trust_registry_artifact_operations_total",
        "Artifact catalogue operations by kind and status",
        &["operation", "status"]
    )
    .expect("Failed to create artifact operations counter")
});

/// Outcome label of one evaluator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Scored,
    Failed,
    TimedOut,
    NotApplicable,
}

impl EvaluationOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Scored => "scored",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::NotApplicable => "not_applicable",
        }
    }
}

pub fn record_evaluation(kind: MetricKind, outcome: EvaluationOutcome, duration_secs: f64) {
    EVALUATIONS_TOTAL
        .with_label_values(&[kind.as_str(), outcome.as_str()])
        .inc();
    EVALUATION_DURATION
        .with_label_values(&[kind.as_str()])
        .observe(duration_secs);
}

pub fn record_artifact_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    ARTIFACT_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}
