//! Ratings and the net score policy
//!
//! A [`Rating`] is derived per request and never stored. Each metric is a
//! score in `[0, 1]` or the sentinel [`NOT_APPLICABLE`] (`-1`). The net
//! score is a fixed weighted sum over the applicable metrics, with the
//! weights of excluded metrics redistributed proportionally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel score for metrics that are not applicable or not computable
pub const NOT_APPLICABLE: f64 = -1.0;

/// Individual metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RampUpTime,
    BusFactor,
    Reproducibility,
    Correctness,
    Responsiveness,
    License,
    SizeScore,
    PerformanceClaims,
    DatasetAndCodeScore,
    DatasetQuality,
    CodeQuality,
    Reviewedness,
    TreeScore,
}

impl MetricKind {
    pub const ALL: [MetricKind; 13] = [
        MetricKind::RampUpTime,
        MetricKind::BusFactor,
        MetricKind::Reproducibility,
        MetricKind::Correctness,
        MetricKind::Responsiveness,
        MetricKind::License,
        MetricKind::SizeScore,
        MetricKind::PerformanceClaims,
        MetricKind::DatasetAndCodeScore,
        MetricKind::DatasetQuality,
        MetricKind::CodeQuality,
        MetricKind::Reviewedness,
        MetricKind::TreeScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RampUpTime => "ramp_up_time",
            Self::BusFactor => "bus_factor",
            Self::Reproducibility => "reproducibility",
            Self::Correctness => "correctness",
            Self::Responsiveness => "responsiveness",
            Self::License => "license",
            Self::SizeScore => "size_score",
            Self::PerformanceClaims => "performance_claims",
            Self::DatasetAndCodeScore => "dataset_and_code_score",
            Self::DatasetQuality => "dataset_quality",
            Self::CodeQuality => "code_quality",
            Self::Reviewedness => "reviewedness",
            Self::TreeScore => "tree_score",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Net score weights; they sum to 1
pub const NET_SCORE_WEIGHTS: [(MetricKind, f64); 13] = [
    (MetricKind::License, 0.14),
    (MetricKind::RampUpTime, 0.10),
    (MetricKind::DatasetAndCodeScore, 0.10),
    (MetricKind::BusFactor, 0.08),
    (MetricKind::Reproducibility, 0.08),
    (MetricKind::SizeScore, 0.08),
    (MetricKind::PerformanceClaims, 0.08),
    (MetricKind::Correctness, 0.06),
    (MetricKind::DatasetQuality, 0.06),
    (MetricKind::CodeQuality, 0.06),
    (MetricKind::TreeScore, 0.06),
    (MetricKind::Responsiveness, 0.05),
    (MetricKind::Reviewedness, 0.05),
];

/// Deployment targets scored by the size metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    RaspberryPi,
    JetsonNano,
    DesktopPc,
    AwsServer,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::RaspberryPi,
        Platform::JetsonNano,
        Platform::DesktopPc,
        Platform::AwsServer,
    ];

    /// Memory envelope available for model weights, in bytes
    pub fn capacity_bytes(&self) -> u64 {
        const GIB: u64 = 1024 * 1024 * 1024;
        match self {
            Self::RaspberryPi => GIB,
            Self::JetsonNano => 2 * GIB,
            Self::DesktopPc => 16 * GIB,
            Self::AwsServer => 128 * GIB,
        }
    }

    /// Fit of an artifact of `size_bytes` on this platform
    ///
    /// Fits comfortably within half the envelope: 1.0; fits at all: 0.5.
    pub fn fit(&self, size_bytes: u64) -> f64 {
        let capacity = self.capacity_bytes();
        if size_bytes <= capacity / 2 {
            1.0
        } else if size_bytes <= capacity {
            0.5
        } else {
            0.0
        }
    }
}

/// Per-platform size fitness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeScore {
    pub raspberry_pi: f64,
    pub jetson_nano: f64,
    pub desktop_pc: f64,
    pub aws_server: f64,
}

impl SizeScore {
    /// Score an artifact footprint against every platform
    pub fn from_size_bytes(size_bytes: u64) -> Self {
        Self {
            raspberry_pi: Platform::RaspberryPi.fit(size_bytes),
            jetson_nano: Platform::JetsonNano.fit(size_bytes),
            desktop_pc: Platform::DesktopPc.fit(size_bytes),
            aws_server: Platform::AwsServer.fit(size_bytes),
        }
    }

    /// All platforms at the sentinel
    pub fn not_applicable() -> Self {
        Self {
            raspberry_pi: NOT_APPLICABLE,
            jetson_nano: NOT_APPLICABLE,
            desktop_pc: NOT_APPLICABLE,
            aws_server: NOT_APPLICABLE,
        }
    }

    pub fn get(&self, platform: Platform) -> f64 {
        match platform {
            Platform::RaspberryPi => self.raspberry_pi,
            Platform::JetsonNano => self.jetson_nano,
            Platform::DesktopPc => self.desktop_pc,
            Platform::AwsServer => self.aws_server,
        }
    }

    /// Mean of the applicable platform scores, used as the size scalar
    pub fn mean(&self) -> Option<f64> {
        let applicable: Vec<f64> = Platform::ALL
            .iter()
            .map(|p| self.get(*p))
            .filter(|s| *s >= 0.0)
            .collect();
        if applicable.is_empty() {
            None
        } else {
            Some(applicable.iter().sum::<f64>() / applicable.len() as f64)
        }
    }
}

/// Result of net score aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct NetScore {
    /// Composite score in `[0, 1]`
    pub value: f64,

    /// Renormalized weights of the metrics that contributed
    pub applied_weights: BTreeMap<MetricKind, f64>,
}

/// Combine scalar metric scores into the net score
///
/// Metrics that are missing or negative are excluded and the remaining
/// weights are scaled to sum to 1. With nothing applicable the score is 0.
pub fn aggregate_net_score(scores: &BTreeMap<MetricKind, f64>) -> NetScore {
    let applicable: Vec<(MetricKind, f64, f64)> = NET_SCORE_WEIGHTS
        .iter()
        .filter_map(|(kind, weight)| {
            scores
                .get(kind)
                .filter(|score| score.is_finite() && **score >= 0.0)
                .map(|score| (*kind, *weight, score.min(1.0)))
        })
        .collect();

    let total_weight: f64 = applicable.iter().map(|(_, w, _)| w).sum();
    if total_weight <= 0.0 {
        return NetScore {
            value: 0.0,
            applied_weights: BTreeMap::new(),
        };
    }

    let mut applied_weights = BTreeMap::new();
    let mut value = 0.0;
    for (kind, weight, score) in applicable {
        let normalized = weight / total_weight;
        applied_weights.insert(kind, normalized);
        value += normalized * score;
    }

    NetScore {
        value: value.clamp(0.0, 1.0),
        applied_weights,
    }
}

/// Computed rating of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub name: String,
    pub category: String,
    pub net_score: f64,
    pub net_score_latency: f64,
    pub ramp_up_time: f64,
    pub ramp_up_time_latency: f64,
    pub bus_factor: f64,
    pub bus_factor_latency: f64,
    pub reproducibility: f64,
    pub reproducibility_latency: f64,
    pub correctness: f64,
    pub correctness_latency: f64,
    pub responsiveness: f64,
    pub responsiveness_latency: f64,
    pub license: f64,
    pub license_latency: f64,
    pub size_score: SizeScore,
    pub size_score_latency: f64,
    pub performance_claims: f64,
    pub performance_claims_latency: f64,
    pub dataset_and_code_score: f64,
    pub dataset_and_code_score_latency: f64,
    pub dataset_quality: f64,
    pub dataset_quality_latency: f64,
    pub code_quality: f64,
    pub code_quality_latency: f64,
    pub reviewedness: f64,
    pub reviewedness_latency: f64,
    /// Mean net score of the registered base models this one derives from
    pub tree_score: f64,
    pub tree_score_latency: f64,
}

impl Rating {
    /// Scalar metric scores as fed to the aggregator
    pub fn scalar_scores(&self) -> BTreeMap<MetricKind, f64> {
        let mut scores = BTreeMap::from([
            (MetricKind::RampUpTime, self.ramp_up_time),
            (MetricKind::BusFactor, self.bus_factor),
            (MetricKind::Reproducibility, self.reproducibility),
            (MetricKind::Correctness, self.correctness),
            (MetricKind::Responsiveness, self.responsiveness),
            (MetricKind::License, self.license),
            (MetricKind::PerformanceClaims, self.performance_claims),
            (MetricKind::DatasetAndCodeScore, self.dataset_and_code_score),
            (MetricKind::DatasetQuality, self.dataset_quality),
            (MetricKind::CodeQuality, self.code_quality),
            (MetricKind::Reviewedness, self.reviewedness),
            (MetricKind::TreeScore, self.tree_score),
        ]);
        scores.insert(
            MetricKind::SizeScore,
            self.size_score.mean().unwrap_or(NOT_APPLICABLE),
        );
        scores
    }
}
