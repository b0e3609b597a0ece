//! Gallery sources and catalog entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::media::MediaKind;

/// One browsable gallery, backed by one storage folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GallerySource {
    /// Free-tier images (Pollinations, Replicate, direct uploads)
    Omnigen,
    /// Commercial images (APIFrame)
    Apiframe,
    /// Free-tier video (Pollinations)
    Video,
    /// Kling video
    Kling,
}

impl GallerySource {
    pub const ALL: [GallerySource; 4] = [
        GallerySource::Omnigen,
        GallerySource::Apiframe,
        GallerySource::Video,
        GallerySource::Kling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GallerySource::Omnigen => "omnigen",
            GallerySource::Apiframe => "apiframe",
            GallerySource::Video => "video",
            GallerySource::Kling => "kling",
        }
    }

    /// Storage folder (key prefix)
    pub fn folder(&self) -> &'static str {
        match self {
            GallerySource::Omnigen => "omniGen",
            GallerySource::Apiframe => "apiFrame",
            GallerySource::Video => "video",
            GallerySource::Kling => "kling_video",
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            GallerySource::Omnigen | GallerySource::Apiframe => MediaKind::Image,
            GallerySource::Video | GallerySource::Kling => MediaKind::Video,
        }
    }
}

impl fmt::Display for GallerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GallerySource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "omnigen" | "pollinations" => Ok(GallerySource::Omnigen),
            "apiframe" => Ok(GallerySource::Apiframe),
            "video" => Ok(GallerySource::Video),
            "kling" => Ok(GallerySource::Kling),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown gallery source '{}'",
                other
            ))),
        }
    }
}

/// One persisted media artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub url: String,
    #[serde(rename = "b2_url")]
    pub durable_url: String,
    #[serde(rename = "key")]
    pub storage_key: String,
    pub folder: String,
    #[serde(rename = "time", with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "source")]
    pub source_label: String,
    #[serde(rename = "type")]
    pub media_kind: MediaKind,
}

impl CatalogEntry {
    /// Entry derived from a stored object. Everything except `created_at`
    /// follows from the source and key, so a relist rebuilds the same entry
    /// a write inserted.
    pub fn new(
        source: GallerySource,
        key: impl Into<String>,
        durable_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let durable_url = durable_url.into();
        Self {
            url: durable_url.clone(),
            durable_url,
            storage_key: key.into(),
            folder: source.folder().to_string(),
            created_at,
            source_label: source.as_str().to_string(),
            media_kind: source.media_kind(),
        }
    }

    /// Entry for an object just written by this process
    pub fn stored(
        source: GallerySource,
        key: impl Into<String>,
        durable_url: impl Into<String>,
    ) -> Self {
        Self::new(source, key, durable_url, Utc::now())
    }
}
