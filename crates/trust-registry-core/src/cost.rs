//! Cost reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ArtifactId;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Convert a storage footprint to megabytes
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MEGABYTE
}

/// Cost of one artifact, in MB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Own cost, or own cost plus dependencies for the root of a dependency report
    pub total_cost: f64,

    /// Own cost of the root, present only in dependency-inclusive reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standalone_cost: Option<f64>,
}

impl CostEntry {
    pub fn standalone(total_cost: f64) -> Self {
        Self {
            total_cost,
            standalone_cost: None,
        }
    }
}

/// Mapping from artifact id to its cost entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostReport(pub BTreeMap<ArtifactId, CostEntry>);

impl CostReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ArtifactId, entry: CostEntry) {
        self.0.insert(id, entry);
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&CostEntry> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_megabytes() {
        assert_eq!(bytes_to_megabytes(1024 * 1024), 1.0);
        assert_eq!(bytes_to_megabytes(0), 0.0);
    }

    #[test]
    fn test_report_serializes_as_map() {
        let id = ArtifactId::new();
        let mut report = CostReport::new();
        report.insert(id, CostEntry::standalone(12.5));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[id.to_string()]["total_cost"], 12.5);
        assert!(json[id.to_string()].get("standalone_cost").is_none());

        let back: CostReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
