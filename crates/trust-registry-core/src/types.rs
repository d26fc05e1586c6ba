//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::RegistryError;

/// Artifact identifier using ULID (Universally Unique Lexicographically Sortable Identifier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Ulid);

impl ArtifactId {
    /// Generate a new ArtifactId
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Create ArtifactId from a ULID
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Get the underlying ULID
    pub fn as_ulid(&self) -> &Ulid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| RegistryError::InvalidArtifactId(format!("{}: {}", s, e)))
    }
}

/// Kind of registered artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// A trained model
    Model,
    /// A dataset used for training or evaluation
    Dataset,
    /// A source code repository
    Code,
}

impl ArtifactType {
    /// All artifact types in declaration order
    pub const ALL: [ArtifactType; 3] = [ArtifactType::Model, ArtifactType::Dataset, ArtifactType::Code];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Dataset => "dataset",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "dataset" => Ok(Self::Dataset),
            "code" => Ok(Self::Code),
            _ => Err(RegistryError::InvalidArtifactType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_id_generation() {
        let id1 = ArtifactId::new();
        let id2 = ArtifactId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_artifact_id_parse_display() {
        let id = ArtifactId::new();
        let parsed: ArtifactId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_artifact_id_invalid() {
        let err = "not-a-ulid".parse::<ArtifactId>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArtifactId(_)));
    }

    #[test]
    fn test_artifact_id_serializes_as_string() {
        let id = ArtifactId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_artifact_type_from_str() {
        assert_eq!("model".parse::<ArtifactType>().unwrap(), ArtifactType::Model);
        assert_eq!("Dataset".parse::<ArtifactType>().unwrap(), ArtifactType::Dataset);
        assert_eq!("code".parse::<ArtifactType>().unwrap(), ArtifactType::Code);
        assert!("weights".parse::<ArtifactType>().is_err());
    }

    #[test]
    fn test_artifact_type_serde() {
        let json = serde_json::to_string(&ArtifactType::Dataset).unwrap();
        assert_eq!(json, "\"dataset\"");
    }
}
