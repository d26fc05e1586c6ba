//! Artifact definitions
//!
//! An [`Artifact`] is the user-visible registry entry. The store keeps it
//! inside an [`ArtifactRecord`] together with the [`SourceMetadata`]
//! resolved from its origin at ingest time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RegistryError, Result};
use crate::locator::SourceLocator;
use crate::types::{ArtifactId, ArtifactType};

/// A registered artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier, generated on creation
    pub id: ArtifactId,

    /// Display name derived from the source URL
    pub name: String,

    /// Artifact kind
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,

    /// Raw source reference as supplied by the user
    pub source_url: String,
}

impl Artifact {
    /// Create a new artifact with a fresh id, deriving its name from the URL
    pub fn new(artifact_type: ArtifactType, source_url: impl Into<String>) -> Result<Self> {
        let source_url = source_url.into();
        let locator = SourceLocator::parse(&source_url)?;
        locator.ensure_supports(artifact_type)?;

        Ok(Self {
            id: ArtifactId::new(),
            name: locator.name().to_string(),
            artifact_type,
            source_url,
        })
    }

    /// Listing view of this artifact
    pub fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata {
            id: self.id,
            name: self.name.clone(),
            artifact_type: self.artifact_type,
        }
    }
}

/// Listing and search result item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Artifact identifier
    pub id: ArtifactId,

    /// Artifact name
    pub name: String,

    /// Artifact kind
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
}

/// Provenance relationship between two artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// The artifact was fine-tuned from this model
    BaseModel,
    /// The artifact was trained with this dataset
    TrainingDataset,
    /// The artifact is built from this code repository
    CodeRepository,
}

impl Relationship {
    /// Whether the relationship makes the target a cost dependency
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::BaseModel | Self::CodeRepository)
    }

    /// Artifact type expected on the referenced side
    pub fn target_type(&self) -> ArtifactType {
        match self {
            Self::BaseModel => ArtifactType::Model,
            Self::TrainingDataset => ArtifactType::Dataset,
            Self::CodeRepository => ArtifactType::Code,
        }
    }

    /// Human-readable label used on lineage edges
    pub fn label(&self) -> &'static str {
        match self {
            Self::BaseModel => "base_model",
            Self::TrainingDataset => "training_dataset",
            Self::CodeRepository => "code_repository",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a declared link was found in the upstream source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    /// Structured model card metadata (`cardData`)
    CardData,
    /// Free text of the model card
    ModelCard,
    /// The model's `config.json`
    ModelConfig,
}

impl LinkOrigin {
    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CardData => "card_data",
            Self::ModelCard => "model_card",
            Self::ModelConfig => "model_config",
        }
    }
}

/// A provenance reference recorded by the upstream source
///
/// Links name their target by source URL and are matched against the
/// store when a read path runs, so a deleted target simply drops out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredLink {
    /// Source URL of the referenced artifact
    pub source_url: String,

    /// How this artifact relates to the referenced one
    pub relationship: Relationship,

    /// Where the link was discovered
    pub origin: LinkOrigin,
}

impl DeclaredLink {
    pub fn new(source_url: impl Into<String>, relationship: Relationship, origin: LinkOrigin) -> Self {
        Self {
            source_url: source_url.into(),
            relationship,
            origin,
        }
    }
}

/// Metadata resolved from the artifact's origin at ingest time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Declared license identifier, as published upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Storage footprint in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Declared provenance links
    #[serde(default)]
    pub links: Vec<DeclaredLink>,
}

impl SourceMetadata {
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_link(mut self, link: DeclaredLink) -> Self {
        self.links.push(link);
        self
    }
}

/// Stored form of an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// The artifact itself
    pub artifact: Artifact,

    /// Ingest-time source metadata
    #[serde(default)]
    pub source: SourceMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub fn new(artifact: Artifact, source: SourceMetadata) -> Self {
        let now = Utc::now();
        Self {
            artifact,
            source,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.artifact.id
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.artifact.artifact_type
    }

    /// Replace the source reference and the metadata resolved from it
    pub fn replace_source(&mut self, source_url: String, name: String, source: SourceMetadata) {
        self.artifact.source_url = source_url;
        self.artifact.name = name;
        self.source = source;
        self.updated_at = Utc::now();
    }
}

/// Query filter used by artifact listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactQuery {
    /// Exact name to match; `*` or absent matches every artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Restrict to these artifact types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<ArtifactType>>,
}

impl ArtifactQuery {
    /// Query matching every artifact
    pub fn all() -> Self {
        Self {
            name: Some("*".to_string()),
            types: None,
        }
    }

    /// Query for an exact name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            types: None,
        }
    }

    pub fn with_types(mut self, types: Vec<ArtifactType>) -> Self {
        self.types = Some(types);
        self
    }

    /// Reject queries that cannot match anything meaningful
    pub fn validate(&self) -> Result<()> {
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(RegistryError::ValidationError(
                "Query name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        let name_matches = match self.name.as_deref() {
            None | Some("*") => true,
            Some(name) => artifact.name == name,
        };
        let type_matches = match &self.types {
            None => true,
            Some(types) => types.is_empty() || types.contains(&artifact.artifact_type),
        };
        name_matches && type_matches
    }
}
