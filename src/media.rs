//! Media kinds and content sniffing

use serde::{Deserialize, Serialize};

/// Kind of media a provider produces or a gallery holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Video => "mp4",
        }
    }

    /// Extensions a catalog relist accepts for this kind
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    pub fn matches_key(&self, key: &str) -> bool {
        let filename = key.rsplit('/').next().unwrap_or(key);
        match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            }
            _ => false,
        }
    }

    /// File extension and content type for downloaded bytes, falling back to
    /// this kind's default when the magic bytes are unknown.
    pub fn sniff(&self, data: &[u8]) -> (&'static str, &'static str) {
        let ext = detect_format(data)
            .filter(|ext| self.extensions().contains(ext))
            .unwrap_or_else(|| self.default_extension());
        (ext, content_type_for(ext))
    }
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Detect media format from binary data using magic bytes
fn detect_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    // ISO base media: ....ftyp
    if &data[4..8] == b"ftyp" {
        return Some("mp4");
    }

    // Matroska/WebM EBML header
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("webm");
    }

    None
}
