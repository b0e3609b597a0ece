//! TTL-bounded catalog cache for one source

use std::time::Duration;
use tokio::time::Instant;

use crate::gallery::source::CatalogEntry;

/// Entries are kept newest first. The only mutations are a prepend on
/// write and a wholesale replace on refresh.
#[derive(Debug, Clone, Default)]
pub struct GalleryCache {
    entries: Vec<CatalogEntry>,
    last_refreshed_at: Option<Instant>,
}

impl GalleryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.last_refreshed_at
    }

    /// Fresh means refreshed less than `ttl` ago and holding something
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        match self.last_refreshed_at {
            Some(at) => !self.entries.is_empty() && now.saturating_duration_since(at) < ttl,
            None => false,
        }
    }

    /// Add a just-written entry. `last_refreshed_at` is left alone.
    pub fn prepend(&mut self, entry: CatalogEntry) {
        // normally index 0; only a clock step backwards places it later
        let index = self
            .entries
            .partition_point(|existing| existing.created_at > entry.created_at);
        self.entries.insert(index, entry);
    }

    /// Replace everything with a fresh listing
    pub fn replace(&mut self, mut entries: Vec<CatalogEntry>, now: Instant) {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.entries = entries;
        self.last_refreshed_at = Some(now);
    }
}
