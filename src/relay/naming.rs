//! Storage key generation

use chrono::Utc;
use uuid::Uuid;

/// `<unix-timestamp>_<6 hex>.<ext>`
pub fn generate_filename(ext: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}.{}", Utc::now().timestamp(), &hex[..6], ext)
}

/// `<folder>/<filename>`
pub fn object_key(folder: &str, filename: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), filename)
}
