//! Artifact store for the trust registry
//!
//! This crate provides persistence for registered artifacts:
//! - The [`ArtifactRepository`] trait abstracting store operations
//! - [`InMemoryArtifactRepository`], a lock-guarded table keyed by `(type, id)`
//! - [`Snapshot`], an immutable view taken atomically for read paths
//! - Store error types
//!
//! # Example
//!
//! ```rust,no_run
//! use trust_registry_core::{Artifact, ArtifactRecord, ArtifactType, SourceMetadata};
//! use trust_registry_db::{ArtifactRepository, InMemoryArtifactRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = InMemoryArtifactRepository::new();
//! let artifact = Artifact::new(ArtifactType::Model, "https://huggingface.co/gpt2")?;
//! repo.create(ArtifactRecord::new(artifact, SourceMetadata::default())).await?;
//!
//! let snapshot = repo.snapshot().await?;
//! assert_eq!(snapshot.len(), 1);
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use trust_registry_core;

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::InMemoryArtifactRepository;
pub use repository::{ArtifactRepository, SearchQuery, SearchResults, Snapshot};

/// Store layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
