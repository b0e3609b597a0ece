//! Configuration module

pub mod settings;

pub use settings::{
    ApiframeConfig, GalleryConfig, KlingConfig, LoggingConfig, PollConfig, PollinationsConfig,
    ProvidersConfig, RelayConfig, ReplicateConfig, RetryConfig, ServerConfig, Settings,
    StorageConfig,
};
