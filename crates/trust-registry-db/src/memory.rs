//! In-memory artifact repository
//!
//! The table lives behind a `tokio::sync::RwLock<Arc<_>>`. Writers take the
//! write lock and mutate through `Arc::make_mut`, cloning the table only
//! when a snapshot still references it. Readers clone the `Arc` under the
//! read lock, which gives every read path an atomic, immutable view.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use trust_registry_core::{ArtifactId, ArtifactRecord, ArtifactType};

use crate::error::{DbError, DbResult};
use crate::repository::{ArtifactRepository, ArtifactTable, SearchQuery, SearchResults, Snapshot};

/// Lock-guarded in-memory store keyed by `(type, id)`
#[derive(Debug, Default)]
pub struct InMemoryArtifactRepository {
    table: RwLock<Arc<ArtifactTable>>,
}

impl InMemoryArtifactRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    #[instrument(skip(self, record), fields(artifact_id = %record.id()))]
    async fn create(&self, record: ArtifactRecord) -> DbResult<ArtifactRecord> {
        let key = (record.artifact_type(), record.id());
        let mut guard = self.table.write().await;

        if guard.contains_key(&key) {
            return Err(DbError::AlreadyExists(record.id().to_string()));
        }

        Arc::make_mut(&mut *guard).insert(key, record.clone());
        debug!("Stored artifact {} ({})", record.id(), record.artifact_type());
        Ok(record)
    }

    async fn find_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &ArtifactId,
    ) -> DbResult<Option<ArtifactRecord>> {
        let guard = self.table.read().await;
        Ok(guard.get(&(artifact_type, *id)).cloned())
    }

    #[instrument(skip(self, record), fields(artifact_id = %record.id()))]
    async fn update(&self, record: ArtifactRecord) -> DbResult<ArtifactRecord> {
        let key = (record.artifact_type(), record.id());
        let mut guard = self.table.write().await;

        if !guard.contains_key(&key) {
            return Err(DbError::NotFound(format!("{} {}", key.0, key.1)));
        }

        Arc::make_mut(&mut *guard).insert(key, record.clone());
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete(&self, artifact_type: ArtifactType, id: &ArtifactId) -> DbResult<()> {
        let mut guard = self.table.write().await;

        if !guard.contains_key(&(artifact_type, *id)) {
            return Err(DbError::NotFound(format!("{} {}", artifact_type, id)));
        }

        Arc::make_mut(&mut *guard).remove(&(artifact_type, *id));
        debug!("Deleted artifact {}", id);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> DbResult<SearchResults> {
        query.validate()?;
        let snapshot = self.snapshot().await?;

        let mut matching: Vec<&ArtifactRecord> =
            snapshot.records().filter(|r| query.matches(r)).collect();
        matching.sort_by_key(|r| r.id());

        let total = matching.len();
        let records = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        Ok(SearchResults {
            records,
            total,
            offset: query.offset,
            limit: query.limit,
        })
    }

    async fn snapshot(&self) -> DbResult<Snapshot> {
        let guard = self.table.read().await;
        Ok(Snapshot::new(Arc::clone(&guard)))
    }

    #[instrument(skip(self))]
    async fn reset(&self) -> DbResult<usize> {
        let mut guard = self.table.write().await;
        let removed = guard.len();
        *guard = Arc::new(ArtifactTable::new());
        info!("Store reset, {} artifacts removed", removed);
        Ok(removed)
    }

    async fn count(&self) -> DbResult<usize> {
        Ok(self.table.read().await.len())
    }

    async fn health_check(&self) -> DbResult<()> {
        tokio::time::timeout(std::time::Duration::from_secs(1), self.table.read())
            .await
            .map(|_| ())
            .map_err(|_| DbError::Internal("store lock unavailable".to_string()))
    }
}
