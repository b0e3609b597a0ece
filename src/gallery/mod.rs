//! Gallery catalog - per-source caches over the object store

pub mod cache;
pub mod source;

pub use cache::GalleryCache;
pub use source::{CatalogEntry, GallerySource};

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{GalleryConfig, StorageConfig};
use crate::error::Result;
use crate::media::MediaKind;
use crate::storage::{ObjectMeta, ObjectStore};

/// Process-wide set of gallery caches, one per [`GallerySource`].
///
/// The store is the source of truth. A refresh lists outside any lock and
/// then swaps the entries in, so it can overwrite a concurrent write; the
/// next relist brings that entry back.
pub struct GalleryCatalog {
    store: Arc<dyn ObjectStore>,
    caches: DashMap<GallerySource, GalleryCache>,
    ttl: Duration,
    image_list_limit: i32,
    video_list_limit: i32,
}

impl GalleryCatalog {
    pub fn new(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        let defaults = StorageConfig::default();
        Self::with_limits(
            store,
            ttl,
            defaults.image_list_limit,
            defaults.video_list_limit,
        )
    }

    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        gallery: &GalleryConfig,
        storage: &StorageConfig,
    ) -> Self {
        Self::with_limits(
            store,
            Duration::from_secs(gallery.ttl_secs),
            storage.image_list_limit,
            storage.video_list_limit,
        )
    }

    pub fn with_limits(
        store: Arc<dyn ObjectStore>,
        ttl: Duration,
        image_list_limit: i32,
        video_list_limit: i32,
    ) -> Self {
        let caches = DashMap::new();
        for source in GallerySource::ALL {
            caches.insert(source, GalleryCache::new());
        }

        Self {
            store,
            caches,
            ttl,
            image_list_limit,
            video_list_limit,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached entries when fresh, otherwise a synchronous refresh.
    /// A failed refresh falls back to whatever is cached.
    pub async fn read(&self, source: GallerySource) -> Vec<CatalogEntry> {
        if let Some(cache) = self.caches.get(&source) {
            if cache.is_fresh(Instant::now(), self.ttl) {
                debug!(source = %source, count = cache.entries().len(), "Serving cached gallery");
                return cache.entries().to_vec();
            }
        }

        match self.refresh(source).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = %source, error = %e, "Gallery refresh failed, serving stale entries");
                self.snapshot(source)
            }
        }
    }

    /// Relist the source folder and replace its cache wholesale
    pub async fn refresh(&self, source: GallerySource) -> Result<Vec<CatalogEntry>> {
        let kind = source.media_kind();
        let limit = match kind {
            MediaKind::Image => self.image_list_limit,
            MediaKind::Video => self.video_list_limit,
        };

        let objects = self.store.list(source.folder(), limit).await?;
        let entries: Vec<CatalogEntry> = objects
            .into_iter()
            .filter(|object| kind.matches_key(&object.key))
            .map(|object| self.entry_from_object(source, object))
            .collect();

        let mut cache = self.caches.entry(source).or_default();
        cache.replace(entries, Instant::now());
        let snapshot = cache.entries().to_vec();
        drop(cache);

        info!(source = %source, count = snapshot.len(), "Refreshed gallery from storage");
        Ok(snapshot)
    }

    /// Prepend a just-stored entry so it is visible before the next relist
    pub fn write(&self, source: GallerySource, entry: CatalogEntry) {
        self.caches.entry(source).or_default().prepend(entry);
        debug!(source = %source, "Prepended gallery entry");
    }

    /// Current cached entries without any refresh
    pub fn snapshot(&self, source: GallerySource) -> Vec<CatalogEntry> {
        self.caches
            .get(&source)
            .map(|cache| cache.entries().to_vec())
            .unwrap_or_default()
    }

    fn entry_from_object(&self, source: GallerySource, object: ObjectMeta) -> CatalogEntry {
        let url = self.store.public_url(&object.key);
        CatalogEntry::new(source, object.key, url, object.last_modified)
    }
}
