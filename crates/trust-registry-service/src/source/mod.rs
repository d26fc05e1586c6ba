//! Upstream source resolution
//!
//! Artifacts live on HuggingFace or GitHub. A [`SourceResolver`] fetches
//! what the registry needs to know about them: declared license, storage
//! footprint, provenance links and the activity signals the metric
//! evaluators score.

mod fixed;
mod http;

pub use fixed::StaticSourceResolver;
pub use http::{HttpSourceResolver, UpstreamConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trust_registry_core::{DeclaredLink, SourceLocator, SourceMetadata};

/// Result type alias for source resolution
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Upstream resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network failure, timeout or unexpected status
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// Response body could not be interpreted
    #[error("malformed source response: {0}")]
    Malformed(String),

    /// The upstream repository does not exist
    #[error("source not found: {0}")]
    NotFound(String),
}

/// Commit count attributed to one author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub author: String,
    pub commits: u64,
}

/// Everything known about an artifact's origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Declared license identifier
    pub license: Option<String>,

    /// Total storage footprint in bytes
    pub size_bytes: Option<u64>,

    /// Download count reported by the hub
    pub downloads: Option<u64>,

    pub likes: Option<u64>,

    /// Last upstream modification
    pub last_modified: Option<DateTime<Utc>>,

    /// Model card or repository README
    pub readme: Option<String>,

    /// Repository file paths
    pub files: Vec<String>,

    /// Structured evaluation results were published (`model-index`, `eval_results`)
    pub has_structured_evaluation: bool,

    /// Commit history grouped by author
    pub contributions: Vec<Contribution>,

    /// Declared provenance links
    pub links: Vec<DeclaredLink>,

    /// Merged pull requests (GitHub); `None` when the count was unavailable
    pub merged_pull_requests: Option<u64>,
}

impl SourceProfile {
    /// The subset stored alongside the artifact at ingest time
    pub fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            license: self.license.clone(),
            size_bytes: self.size_bytes,
            links: self.links.clone(),
        }
    }
}

/// Resolves artifact origins
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Fetch the full profile of a source
    async fn resolve(&self, locator: &SourceLocator) -> SourceResult<SourceProfile>;

    /// Fetch only the declared license of a repository
    async fn repository_license(&self, locator: &SourceLocator) -> SourceResult<Option<String>> {
        self.resolve(locator).await.map(|profile| profile.license)
    }
}
