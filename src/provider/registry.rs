//! Provider registry - dispatch by [`ProviderKind`]

use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::ProvidersConfig;
use crate::error::{AppError, Result};
use crate::provider::apiframe::{ApiframeModel, ApiframeProvider};
use crate::provider::kling::KlingProvider;
use crate::provider::pollinations::PollinationsProvider;
use crate::provider::replicate::ReplicateProvider;
use crate::provider::traits::{MediaProvider, ProviderKind};

/// Every provider the gateway knows, keyed by kind.
///
/// Pollinations and Kling are also kept typed for the operations that sit
/// outside the generation flow (prompt optimizer, model catalog, key status).
pub struct ProviderRegistry {
    providers: DashMap<ProviderKind, Arc<dyn MediaProvider>>,
    pollinations: Arc<PollinationsProvider>,
    kling: Arc<KlingProvider>,
}

impl ProviderRegistry {
    pub fn from_config(client: Client, config: &ProvidersConfig) -> Self {
        let pollinations = Arc::new(PollinationsProvider::new(
            client.clone(),
            config.pollinations.clone(),
        ));
        let kling = Arc::new(KlingProvider::new(client.clone(), config.kling.clone()));

        let registry = Self {
            providers: DashMap::new(),
            pollinations: pollinations.clone(),
            kling: kling.clone(),
        };

        for model in [
            ApiframeModel::Ideogram,
            ApiframeModel::Flux,
            ApiframeModel::NanoBanana,
        ] {
            registry.register(Arc::new(ApiframeProvider::new(
                client.clone(),
                model,
                config.apiframe.clone(),
            )));
        }
        registry.register(kling);
        registry.register(pollinations);
        registry.register(Arc::new(ReplicateProvider::new(
            client,
            config.replicate.clone(),
        )));

        for entry in registry.providers.iter() {
            info!(
                provider = %entry.key(),
                configured = entry.value().is_configured(),
                "Registered provider"
            );
        }

        registry
    }

    /// Add or replace the provider for its kind
    pub fn register(&self, provider: Arc<dyn MediaProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn MediaProvider>> {
        self.providers
            .get(&kind)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::ProviderNotConfigured(kind.to_string()))
    }

    pub fn pollinations(&self) -> &Arc<PollinationsProvider> {
        &self.pollinations
    }

    pub fn kling(&self) -> &Arc<KlingProvider> {
        &self.kling
    }
}
