//! Dependency graph structures
//!
//! This module tracks "depends on" edges between artifacts and provides
//! cycle detection and transitive closure over them. Traversal uses an
//! explicit stack so deep or cyclic inputs cannot exhaust the call stack.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{RegistryError, Result};
use crate::types::ArtifactId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Dependency graph for tracking artifact relationships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// Map from artifact ID to the artifacts it depends on, in insertion order
    dependencies: HashMap<ArtifactId, Vec<ArtifactId>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `artifact_id` depends on `dependency`
    ///
    /// Duplicate edges are ignored.
    pub fn add_dependency(&mut self, artifact_id: ArtifactId, dependency: ArtifactId) {
        let deps = self.dependencies.entry(artifact_id).or_default();
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
    }

    /// Direct dependencies of an artifact
    pub fn get_dependencies(&self, artifact_id: &ArtifactId) -> &[ArtifactId] {
        self.dependencies
            .get(artifact_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Detect circular dependencies anywhere in the graph
    pub fn detect_circular_dependencies(&self) -> Result<()> {
        let mut marks = HashMap::new();
        let mut roots: Vec<&ArtifactId> = self.dependencies.keys().collect();
        roots.sort();
        for root in roots {
            if !marks.contains_key(root) {
                self.visit(*root, &mut marks)?;
            }
        }
        Ok(())
    }

    /// Detect circular dependencies reachable from `root`
    pub fn detect_cycle_from(&self, root: ArtifactId) -> Result<()> {
        self.visit(root, &mut HashMap::new())
    }

    fn visit(&self, start: ArtifactId, marks: &mut HashMap<ArtifactId, Mark>) -> Result<()> {
        let mut stack: Vec<(ArtifactId, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::InProgress);

        while let Some(&(node, index)) = stack.last() {
            let next = self.get_dependencies(&node).get(index).copied();

            let Some(next) = next else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match marks.get(&next) {
                Some(Mark::InProgress) => {
                    let cycle_start = stack.iter().position(|(id, _)| *id == next).unwrap_or(0);
                    let mut cycle_path: Vec<String> =
                        stack[cycle_start..].iter().map(|(id, _)| id.to_string()).collect();
                    cycle_path.push(next.to_string());

                    return Err(RegistryError::CircularDependency(format!(
                        "Cycle detected: {}",
                        cycle_path.join(" -> ")
                    )));
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, 0));
                }
            }
        }

        Ok(())
    }

    /// All direct and transitive dependencies of an artifact
    ///
    /// Breadth-first, so nearer dependencies come first. The artifact
    /// itself is never included.
    pub fn get_all_dependencies(&self, artifact_id: &ArtifactId) -> Vec<ArtifactId> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::from([*artifact_id]);
        let mut queue = VecDeque::from([*artifact_id]);

        while let Some(current) = queue.pop_front() {
            for dep in self.get_dependencies(&current) {
                if seen.insert(*dep) {
                    ordered.push(*dep);
                    queue.push_back(*dep);
                }
            }
        }

        ordered
    }
}

/// Collects `(artifact, dependency)` pairs
impl FromIterator<(ArtifactId, ArtifactId)> for DependencyGraph {
    fn from_iter<I: IntoIterator<Item = (ArtifactId, ArtifactId)>>(iter: I) -> Self {
        let mut graph = Self::new();
        for (artifact_id, dependency) in iter {
            graph.add_dependency(artifact_id, dependency);
        }
        graph
    }
}
