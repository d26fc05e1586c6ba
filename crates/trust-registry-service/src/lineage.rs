//! Lineage service
//!
//! Builds the provenance graph around one artifact with two breadth-first
//! walks: up through the artifacts it derives from (base models, training
//! datasets, code) and down through the artifacts that declare it as an
//! ancestor. Siblings sharing an ancestor are not part of the graph.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};
use trust_registry_core::{
    ArtifactId, ArtifactRecord, ArtifactType, DependencyGraph, Direction, LineageEdge,
    LineageGraph, LineageNode, ProvenanceEdge, ProvenanceIndex,
};
use trust_registry_db::ArtifactRepository;

use crate::error::ServiceResult;

/// Node source of the requested artifact
const ROOT_SOURCE: &str = "registry";

/// Trait for lineage graph construction
#[async_trait]
pub trait LineageService: Send + Sync {
    /// Lineage graph rooted at an artifact
    async fn lineage(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<LineageGraph>;
}

/// Default implementation of LineageService
pub struct DefaultLineageService {
    repository: Arc<dyn ArtifactRepository>,
}

impl DefaultLineageService {
    /// Create a new lineage service
    pub fn new(repository: Arc<dyn ArtifactRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl LineageService for DefaultLineageService {
    #[instrument(skip(self), fields(artifact_type = %artifact_type, id = %id))]
    async fn lineage(&self, artifact_type: ArtifactType, id: &ArtifactId) -> ServiceResult<LineageGraph> {
        let snapshot = self.repository.snapshot().await?;
        let root = snapshot.require(artifact_type, id)?;
        let index = ProvenanceIndex::build(snapshot.records());
        let by_id: HashMap<ArtifactId, &ArtifactRecord> =
            snapshot.records().map(|r| (r.id(), r)).collect();

        let graph = build_lineage(root, &index, &by_id)?;
        debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "Lineage built");
        Ok(graph)
    }
}

/// Ancestors and descendants of `root`, failing on a cycle among the walked edges
fn build_lineage(
    root: &ArtifactRecord,
    index: &ProvenanceIndex,
    by_id: &HashMap<ArtifactId, &ArtifactRecord>,
) -> ServiceResult<LineageGraph> {
    let root_id = root.id();
    let mut nodes = vec![LineageNode {
        artifact_id: root_id,
        name: root.artifact.name.clone(),
        source: ROOT_SOURCE.to_string(),
    }];
    let mut listed = HashSet::from([root_id]);
    let mut walked: Vec<&ProvenanceEdge> = Vec::new();
    let mut seen_edges = HashSet::new();

    for direction in [Direction::Ancestors, Direction::Descendants] {
        for edge in index.walk(root_id, direction, |_| true) {
            if !seen_edges.insert((edge.parent, edge.child, edge.relationship)) {
                continue;
            }
            walked.push(edge);

            let reached = match direction {
                Direction::Ancestors => edge.parent,
                Direction::Descendants => edge.child,
            };
            if listed.insert(reached) {
                if let Some(record) = by_id.get(&reached) {
                    nodes.push(LineageNode {
                        artifact_id: reached,
                        name: record.artifact.name.clone(),
                        source: edge.origin.as_str().to_string(),
                    });
                }
            }
        }
    }

    let derivation: DependencyGraph = walked.iter().map(|e| (e.child, e.parent)).collect();
    derivation.detect_circular_dependencies()?;

    let edges = walked
        .into_iter()
        .map(|edge| LineageEdge {
            from_node_artifact_id: edge.parent,
            to_node_artifact_id: edge.child,
            relationship: edge.relationship.label().to_string(),
        })
        .collect();

    Ok(LineageGraph { nodes, edges })
}
