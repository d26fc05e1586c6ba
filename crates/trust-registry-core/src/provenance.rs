//! Provenance edges resolved over a store snapshot
//!
//! Artifacts carry [`DeclaredLink`](crate::DeclaredLink)s naming related
//! repositories by URL or hub id. A [`ProvenanceIndex`] matches those links
//! against one consistent set of records and exposes the resulting
//! ancestor -> descendant edges. Links whose target is not registered are
//! dropped, so every edge refers to artifacts present in the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::artifact::{ArtifactRecord, LinkOrigin, Relationship};
use crate::dependency::DependencyGraph;
use crate::locator::SourceLocator;
use crate::types::{ArtifactId, ArtifactType};

/// A resolved provenance edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvenanceEdge {
    /// The ancestor (base model, dataset, code repository)
    pub parent: ArtifactId,
    /// The artifact that declared the link
    pub child: ArtifactId,
    pub relationship: Relationship,
    pub origin: LinkOrigin,
}

/// Which way a walk follows provenance edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From descendants towards the artifacts they derive from
    Ancestors,
    /// From ancestors towards the artifacts derived from them
    Descendants,
}

/// Provenance edges for one snapshot
#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    edges: Vec<ProvenanceEdge>,
}

impl ProvenanceIndex {
    /// Resolve declared links of `records` against the records themselves
    pub fn build<'a>(records: impl IntoIterator<Item = &'a ArtifactRecord>) -> Self {
        let mut records: Vec<&ArtifactRecord> = records.into_iter().collect();
        records.sort_by_key(|r| r.id());

        let mut by_url: HashMap<String, ArtifactId> = HashMap::new();
        let mut by_name: HashMap<(ArtifactType, String), Vec<ArtifactId>> = HashMap::new();
        for record in &records {
            if let Ok(locator) = SourceLocator::parse(&record.artifact.source_url) {
                by_url.entry(locator.canonical_url()).or_insert(record.id());
            }
            by_name
                .entry((record.artifact_type(), record.artifact.name.to_ascii_lowercase()))
                .or_default()
                .push(record.id());
        }

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for record in &records {
            let child = record.id();
            for link in &record.source.links {
                let target_type = link.relationship.target_type();
                let Ok(locator) = SourceLocator::from_reference(&link.source_url, target_type) else {
                    continue;
                };

                let parent = by_url.get(&locator.canonical_url()).copied().or_else(|| {
                    // Hub ids are often re-homed under organisations; fall back to a
                    // unique name match within the expected type.
                    match by_name.get(&(target_type, locator.name().to_ascii_lowercase())) {
                        Some(ids) if ids.len() == 1 => Some(ids[0]),
                        _ => None,
                    }
                });

                let Some(parent) = parent else { continue };
                if parent == child || !seen.insert((parent, child, link.relationship)) {
                    continue;
                }

                edges.push(ProvenanceEdge {
                    parent,
                    child,
                    relationship: link.relationship,
                    origin: link.origin,
                });
            }
        }

        Self { edges }
    }

    pub fn edges(&self) -> &[ProvenanceEdge] {
        &self.edges
    }

    /// Edges in which `id` is the descendant
    pub fn parents_of(&self, id: &ArtifactId) -> impl Iterator<Item = &ProvenanceEdge> {
        let id = *id;
        self.edges.iter().filter(move |e| e.child == id)
    }

    /// Edges in which `id` is the ancestor
    pub fn children_of(&self, id: &ArtifactId) -> impl Iterator<Item = &ProvenanceEdge> {
        let id = *id;
        self.edges.iter().filter(move |e| e.parent == id)
    }

    /// Breadth-first walk from `root` in one direction
    ///
    /// Only edges accepted by `follow` are traversed. Each edge is returned
    /// once, in discovery order; a cycle ends the walk at the first
    /// revisited node.
    pub fn walk(
        &self,
        root: ArtifactId,
        direction: Direction,
        follow: impl Fn(&ProvenanceEdge) -> bool,
    ) -> Vec<&ProvenanceEdge> {
        let mut walked = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            let step: Vec<(&ProvenanceEdge, ArtifactId)> = match direction {
                Direction::Ancestors => self.parents_of(&current).map(|e| (e, e.parent)).collect(),
                Direction::Descendants => self.children_of(&current).map(|e| (e, e.child)).collect(),
            };
            for (edge, next) in step {
                if !follow(edge) {
                    continue;
                }
                walked.push(edge);
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        walked
    }

    /// Graph of dependency-type relationships: child depends on parent
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.edges
            .iter()
            .filter(|e| e.relationship.is_dependency())
            .map(|e| (e.child, e.parent))
            .collect()
    }
}
