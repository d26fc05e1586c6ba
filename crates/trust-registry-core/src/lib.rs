//! Core domain models and scoring policy for the trust registry
//!
//! This crate contains the data structures that describe registered
//! artifacts (models, datasets, code), the derived documents computed
//! over them (ratings, cost reports, lineage graphs) and the fixed policy
//! tables the service applies: net score weights, license classification
//! and compatibility, and per-platform size envelopes.

pub mod artifact;
pub mod cost;
pub mod dependency;
pub mod error;
pub mod license;
pub mod lineage;
pub mod locator;
pub mod provenance;
pub mod rating;
pub mod types;

// Re-exports for convenience
pub use artifact::{
    Artifact, ArtifactMetadata, ArtifactQuery, ArtifactRecord, DeclaredLink, LinkOrigin,
    Relationship, SourceMetadata,
};
pub use cost::{bytes_to_megabytes, CostEntry, CostReport};
pub use dependency::DependencyGraph;
pub use error::{RegistryError, Result};
pub use license::{is_compatible, license_score, LicenseCheckResult, LicenseClass};
pub use lineage::{LineageEdge, LineageGraph, LineageNode};
pub use locator::SourceLocator;
pub use provenance::{Direction, ProvenanceEdge, ProvenanceIndex};
pub use rating::{
    aggregate_net_score, MetricKind, NetScore, Platform, Rating, SizeScore, NOT_APPLICABLE,
    NET_SCORE_WEIGHTS,
};
pub use types::{ArtifactId, ArtifactType};
