//! Resolver backed by a fixed table of profiles
//!
//! Used by tests and offline deployments: sources are looked up by
//! canonical URL, unknown sources are `NotFound` and sources registered as
//! unreachable fail the way a network outage would.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use trust_registry_core::SourceLocator;
use tracing::debug;

use super::{SourceError, SourceProfile, SourceResolver, SourceResult};

#[derive(Debug, Clone)]
enum Entry {
    Available(SourceProfile),
    Unreachable,
}

/// In-memory [`SourceResolver`]
#[derive(Debug, Default)]
pub struct StaticSourceResolver {
    entries: HashMap<String, Entry>,
    calls: AtomicUsize,
}

impl StaticSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile for a source URL
    ///
    /// Malformed URLs are kept verbatim so lookups of the same string still match.
    pub fn with_profile(mut self, source_url: &str, profile: SourceProfile) -> Self {
        self.entries.insert(canonical_key(source_url), Entry::Available(profile));
        self
    }

    /// Make a source URL fail as unreachable
    pub fn with_unreachable(mut self, source_url: &str) -> Self {
        self.entries.insert(canonical_key(source_url), Entry::Unreachable);
        self
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

fn canonical_key(source_url: &str) -> String {
    SourceLocator::parse(source_url)
        .map(|locator| locator.canonical_url())
        .unwrap_or_else(|_| source_url.to_string())
}

#[async_trait]
impl SourceResolver for StaticSourceResolver {
    async fn resolve(&self, locator: &SourceLocator) -> SourceResult<SourceProfile> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let key = locator.canonical_url();
        debug!(source = %key, "Resolving from static table");

        match self.entries.get(&key) {
            Some(Entry::Available(profile)) => Ok(profile.clone()),
            Some(Entry::Unreachable) => Err(SourceError::Unreachable(key)),
            None => Err(SourceError::NotFound(key)),
        }
    }
}
