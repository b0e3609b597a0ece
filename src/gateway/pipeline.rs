//! Generation pipeline - poller, relay and gallery wired together

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::gallery::{CatalogEntry, GalleryCatalog, GallerySource};
use crate::gateway::poller;
use crate::media::MediaKind;
use crate::provider::{GenerationJob, ProviderRegistry};
use crate::relay::MediaRelay;

/// What a generation request returns to the caller
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// The provider's own result URL
    pub url: String,
    /// Durable URL, or the provider URL again when the relay failed
    pub b2_url: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(rename = "type")]
    pub media: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Whether `b2_url` points into object storage
    #[serde(skip)]
    pub durable: bool,
}

impl GenerationOutcome {
    pub fn is_durable(&self) -> bool {
        self.durable
    }
}

/// Entry point for every generation request
pub struct GenerationService {
    providers: Arc<ProviderRegistry>,
    relay: Arc<MediaRelay>,
    gallery: Arc<GalleryCatalog>,
}

impl GenerationService {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        relay: Arc<MediaRelay>,
        gallery: Arc<GalleryCatalog>,
    ) -> Self {
        Self {
            providers,
            relay,
            gallery,
        }
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn gallery(&self) -> &Arc<GalleryCatalog> {
        &self.gallery
    }

    /// Run a job to completion and persist its result.
    ///
    /// Provider failures are returned. Storage failures are not: the
    /// outcome then points at the provider URL for both fields and the
    /// gallery is left untouched.
    #[instrument(skip(self, job), fields(provider = %job.provider))]
    pub async fn generate(&self, job: GenerationJob) -> Result<GenerationOutcome> {
        let provider = self.providers.get(job.provider)?;
        let destination = provider.destination(&job);
        let media = destination.source.media_kind();

        let completion = poller::run(provider.as_ref(), &job).await?;
        let result_url = completion.result.url;

        let stored = self
            .relay
            .relay(
                &result_url,
                destination.source.folder(),
                media,
                &completion.result.download_headers,
            )
            .await;

        let durable = stored.is_some();
        let b2_url = match stored {
            Some(stored) => {
                self.gallery.write(
                    destination.source,
                    CatalogEntry::stored(
                        destination.source,
                        stored.key,
                        stored.durable_url.clone(),
                    ),
                );
                stored.durable_url
            }
            None => result_url.clone(),
        };

        info!(
            source = %destination.source,
            label = %destination.label,
            task_id = ?completion.task_id,
            durable = durable,
            "Generation complete"
        );

        Ok(GenerationOutcome {
            url: result_url,
            b2_url,
            source: destination.label,
            task_id: completion.task_id,
            media,
            model: job.model,
            durable,
        })
    }

    /// Store bytes uploaded by a user directly into the omnigen gallery.
    /// Unlike generation, a storage failure here is the request's failure.
    pub async fn upload(&self, data: Vec<u8>) -> Result<GenerationOutcome> {
        let source = GallerySource::Omnigen;
        let stored = self
            .relay
            .store_bytes(data, source.folder(), source.media_kind())
            .await?;

        self.gallery.write(
            source,
            CatalogEntry::stored(source, stored.key, stored.durable_url.clone()),
        );

        Ok(GenerationOutcome {
            url: stored.durable_url.clone(),
            b2_url: stored.durable_url,
            source: "upload".to_string(),
            task_id: None,
            media: MediaKind::Image,
            model: None,
            durable: true,
        })
    }

    pub async fn list_catalog(&self, source: GallerySource) -> Vec<CatalogEntry> {
        self.gallery.read(source).await
    }

    pub async fn refresh_catalog(&self, source: GallerySource) -> Result<Vec<CatalogEntry>> {
        self.gallery.refresh(source).await
    }
}
