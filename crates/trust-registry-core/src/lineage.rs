//! Lineage graph documents

use serde::{Deserialize, Serialize};

use crate::types::ArtifactId;

/// A node of a lineage graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub artifact_id: ArtifactId,
    pub name: String,
    /// Where the node's relation was discovered; `registry` for the root
    pub source: String,
}

/// A directed edge from ancestor to descendant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from_node_artifact_id: ArtifactId,
    pub to_node_artifact_id: ArtifactId,
    pub relationship: String,
}

/// Provenance graph around one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageGraph {
    pub fn contains_node(&self, id: &ArtifactId) -> bool {
        self.nodes.iter().any(|n| n.artifact_id == *id)
    }
}
