//! Repository trait abstractions for artifact persistence
//!
//! This module defines the ArtifactRepository trait that abstracts store
//! operations, and the snapshot type read paths evaluate against.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use trust_registry_core::{ArtifactId, ArtifactQuery, ArtifactRecord, ArtifactType};

use crate::error::{DbError, DbResult};

/// Table layout shared by the store and its snapshots
pub type ArtifactTable = BTreeMap<(ArtifactType, ArtifactId), ArtifactRecord>;

/// Query parameters for listing artifacts
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Filters combined with OR; an empty list matches nothing
    pub queries: Vec<ArtifactQuery>,

    /// Maximum number of results to return
    pub limit: usize,

    /// Number of results to skip (for pagination)
    pub offset: usize,
}

impl SearchQuery {
    /// Create a new search query with default pagination
    pub fn new(queries: Vec<ArtifactQuery>) -> Self {
        Self {
            queries,
            limit: 50,
            offset: 0,
        }
    }

    /// Set result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set result offset
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Validate query parameters
    pub fn validate(&self) -> DbResult<()> {
        if self.limit == 0 {
            return Err(DbError::InvalidQuery("Limit must be positive".to_string()));
        }
        for query in &self.queries {
            query.validate()?;
        }
        Ok(())
    }

    pub fn matches(&self, record: &ArtifactRecord) -> bool {
        self.queries.iter().any(|q| q.matches(&record.artifact))
    }
}

/// Paged search results
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Records on this page, in id order
    pub records: Vec<ArtifactRecord>,

    /// Total number of matching records (without pagination)
    pub total: usize,

    /// Offset used for this query
    pub offset: usize,

    /// Limit used for this query
    pub limit: usize,
}

impl SearchResults {
    /// Check if there are more results available
    pub fn has_more(&self) -> bool {
        self.offset + self.records.len() < self.total
    }

    /// Offset of the next page, when there is one
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more().then(|| self.offset + self.records.len())
    }
}

/// Immutable view of the store taken at one instant
///
/// Holding a snapshot never blocks writers; later mutations are not visible
/// through it.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    table: Arc<ArtifactTable>,
}

impl Snapshot {
    pub fn new(table: Arc<ArtifactTable>) -> Self {
        Self { table }
    }

    pub fn get(&self, artifact_type: ArtifactType, id: &ArtifactId) -> Option<&ArtifactRecord> {
        self.table.get(&(artifact_type, *id))
    }

    /// Fetch an artifact, failing with `NotFound` when absent
    pub fn require(&self, artifact_type: ArtifactType, id: &ArtifactId) -> DbResult<&ArtifactRecord> {
        self.get(artifact_type, id)
            .ok_or_else(|| DbError::NotFound(format!("{} {}", artifact_type, id)))
    }

    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Repository trait for artifact persistence operations
///
/// Implementations must serialize mutations and hand out snapshots that
/// observe each mutation either completely or not at all.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Insert a new artifact
    async fn create(&self, record: ArtifactRecord) -> DbResult<ArtifactRecord>;

    /// Find an artifact by type and id
    async fn find_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
    ) -> DbResult<Option<ArtifactRecord>>;

    /// Replace an existing artifact
    async fn update(&self, record: ArtifactRecord) -> DbResult<ArtifactRecord>;

    /// Delete an artifact
    async fn delete(&self, artifact_type: ArtifactType, id: &ArtifactId) -> DbResult<()>;

    /// List artifacts matching any of the query filters
    async fn search(&self, query: &SearchQuery) -> DbResult<SearchResults>;

    /// Take an atomic snapshot of the whole store
    async fn snapshot(&self) -> DbResult<Snapshot>;

    /// Remove every artifact, returning how many were removed
    async fn reset(&self) -> DbResult<usize>;

    /// Count stored artifacts
    async fn count(&self) -> DbResult<usize>;

    /// Check store health
    async fn health_check(&self) -> DbResult<()>;
}
