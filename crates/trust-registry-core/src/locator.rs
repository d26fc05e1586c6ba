//! Source URL interpretation
//!
//! Artifacts are registered by URL. A [`SourceLocator`] is the parsed,
//! host-specific form of that URL; it yields the artifact name, the
//! canonical URL used to match declared links, and the API coordinates the
//! source resolver queries.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RegistryError, Result};
use crate::types::ArtifactType;

const HUGGING_FACE_HOSTS: [&str; 3] = ["huggingface.co", "www.huggingface.co", "hf.co"];
const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Path segments after which a HuggingFace URL points inside the repository
const HUGGING_FACE_VIEW_SEGMENTS: [&str; 5] = ["tree", "blob", "resolve", "raw", "discussions"];

/// Parsed artifact origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLocator {
    /// A model repository on the HuggingFace hub
    HuggingFaceModel { repo_id: String },
    /// A dataset repository on the HuggingFace hub
    HuggingFaceDataset { repo_id: String },
    /// A GitHub repository
    GitHub { owner: String, repo: String },
}

impl SourceLocator {
    /// Parse a source URL
    pub fn parse(source_url: &str) -> Result<Self> {
        let url = Url::parse(source_url.trim())?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidSourceUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| RegistryError::InvalidSourceUrl(format!("missing host in {}", source_url)))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if HUGGING_FACE_HOSTS.contains(&host.as_str()) {
            Self::parse_hugging_face(&segments, source_url)
        } else if GITHUB_HOSTS.contains(&host.as_str()) {
            Self::parse_github(&segments, source_url)
        } else {
            Err(RegistryError::InvalidSourceUrl(format!(
                "unsupported host '{}'",
                host
            )))
        }
    }

    fn parse_hugging_face(segments: &[&str], source_url: &str) -> Result<Self> {
        let (is_dataset, rest) = match segments.first() {
            Some(&"datasets") => (true, &segments[1..]),
            Some(&"spaces") => {
                return Err(RegistryError::InvalidSourceUrl(format!(
                    "spaces are not registrable: {}",
                    source_url
                )))
            }
            _ => (false, segments),
        };

        let repo: Vec<&str> = rest
            .iter()
            .take_while(|seg| !HUGGING_FACE_VIEW_SEGMENTS.contains(seg))
            .take(2)
            .copied()
            .collect();

        if repo.is_empty() {
            return Err(RegistryError::InvalidSourceUrl(format!(
                "missing repository in {}",
                source_url
            )));
        }

        let repo_id = repo.join("/");
        Ok(if is_dataset {
            Self::HuggingFaceDataset { repo_id }
        } else {
            Self::HuggingFaceModel { repo_id }
        })
    }

    fn parse_github(segments: &[&str], source_url: &str) -> Result<Self> {
        match segments {
            [owner, repo, ..] => Ok(Self::GitHub {
                owner: owner.to_string(),
                repo: repo.trim_end_matches(".git").to_string(),
            }),
            _ => Err(RegistryError::InvalidSourceUrl(format!(
                "expected https://github.com/<owner>/<repo>, got {}",
                source_url
            ))),
        }
    }

    /// Turn a reference found in upstream metadata into a locator
    ///
    /// HuggingFace card data names related repositories by bare id
    /// (`openai-community/gpt2`); `fallback_type` says which hub namespace
    /// the bare id lives in.
    pub fn from_reference(reference: &str, fallback_type: ArtifactType) -> Result<Self> {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Self::parse(reference);
        }
        if reference.is_empty() || reference.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidSourceUrl(format!(
                "not a repository reference: '{}'",
                reference
            )));
        }
        let repo_id = reference.trim_matches('/').to_string();
        match fallback_type {
            ArtifactType::Dataset => Ok(Self::HuggingFaceDataset { repo_id }),
            ArtifactType::Model => Ok(Self::HuggingFaceModel { repo_id }),
            ArtifactType::Code => Self::parse(&format!("https://github.com/{}", repo_id)),
        }
    }

    /// Whether an artifact of `artifact_type` may originate here
    pub fn supports(&self, artifact_type: ArtifactType) -> bool {
        match (self, artifact_type) {
            (Self::HuggingFaceModel { .. }, ArtifactType::Model) => true,
            (Self::HuggingFaceDataset { .. }, ArtifactType::Dataset) => true,
            (Self::GitHub { .. }, ArtifactType::Dataset | ArtifactType::Code) => true,
            _ => false,
        }
    }

    pub fn ensure_supports(&self, artifact_type: ArtifactType) -> Result<()> {
        if self.supports(artifact_type) {
            Ok(())
        } else {
            Err(RegistryError::InvalidSourceUrl(format!(
                "{} cannot host a {} artifact",
                self.canonical_url(),
                artifact_type
            )))
        }
    }

    /// Artifact name: the last segment of the repository path
    pub fn name(&self) -> &str {
        match self {
            Self::HuggingFaceModel { repo_id } | Self::HuggingFaceDataset { repo_id } => {
                repo_id.rsplit('/').next().unwrap_or(repo_id)
            }
            Self::GitHub { repo, .. } => repo,
        }
    }

    /// Normalized URL used for matching declared links
    pub fn canonical_url(&self) -> String {
        match self {
            Self::HuggingFaceModel { repo_id } => {
                format!("https://huggingface.co/{}", repo_id.to_ascii_lowercase())
            }
            Self::HuggingFaceDataset { repo_id } => {
                format!("https://huggingface.co/datasets/{}", repo_id.to_ascii_lowercase())
            }
            Self::GitHub { owner, repo } => format!(
                "https://github.com/{}/{}",
                owner.to_ascii_lowercase(),
                repo.to_ascii_lowercase()
            ),
        }
    }
}
