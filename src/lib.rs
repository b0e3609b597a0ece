//! Generative Media Gateway
//!
//! Fronts several third-party image and video generation providers behind
//! one HTTP API. Provider results are copied into object storage so they
//! outlive the provider's own URLs, and each storage folder is browsable as
//! a cached gallery.

pub mod api;
pub mod config;
pub mod error;
pub mod gallery;
pub mod gateway;
pub mod media;
pub mod provider;
pub mod relay;
pub mod retry;
pub mod storage;

pub use error::{AppError, Result};

use std::sync::Arc;
use std::time::Duration;

use config::Settings;
use gallery::GalleryCatalog;
use gateway::GenerationService;
use provider::ProviderRegistry;
use relay::MediaRelay;
use storage::ObjectStore;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<Settings>,
    pub providers: Arc<ProviderRegistry>,
    pub relay: Arc<MediaRelay>,
    pub gallery: Arc<GalleryCatalog>,
    pub generation: Arc<GenerationService>,
}

impl AppState {
    /// Build the state with the object store the settings describe
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let store = storage::from_config(&settings.storage);
        Self::with_store(settings, store)
    }

    /// Build the state around an explicit object store
    pub fn with_store(settings: Settings, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let providers = Arc::new(ProviderRegistry::from_config(
            client.clone(),
            &settings.providers,
        ));
        let relay = Arc::new(MediaRelay::new(
            client,
            store.clone(),
            settings.storage.upload_workers,
            &settings.relay,
        ));
        let gallery = Arc::new(GalleryCatalog::from_config(
            store,
            &settings.gallery,
            &settings.storage,
        ));
        let generation = Arc::new(GenerationService::new(
            providers.clone(),
            relay.clone(),
            gallery.clone(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            providers,
            relay,
            gallery,
            generation,
        })
    }
}
