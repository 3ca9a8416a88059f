//! Cover-image uploads.
//!
//! Validation is shared; where the bytes end up is decided by an
//! [`ImageStorage`] backend chosen from configuration.

pub mod storage;

use std::path::Path;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

pub use storage::{ImageStorage, LocalDiskStorage, PlaceholderStorage, StoredImage};

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image was uploaded")]
    MissingFile,

    #[error("Only images are allowed (jpeg, jpg, png, gif, webp)")]
    UnsupportedType,

    #[error("File too large: the limit is {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to store image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// Whether the client is at fault (as opposed to a storage failure).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// Checks both the file extension and the declared MIME type against the
/// allow-list. Returns the lowercased extension without the dot.
pub fn validate_image(file_name: &str, content_type: Option<&str>) -> Result<String, UploadError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(UploadError::UnsupportedType)?;

    if !ALLOWED_IMAGE_TYPES.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedType);
    }

    let subtype = content_type
        .map(str::to_ascii_lowercase)
        .and_then(|mime| {
            let essence = mime.split(';').next().unwrap_or_default().trim().to_string();
            essence.strip_prefix("image/").map(str::to_string)
        })
        .ok_or(UploadError::UnsupportedType)?;

    if !ALLOWED_IMAGE_TYPES.contains(&subtype.as_str()) {
        return Err(UploadError::UnsupportedType);
    }

    Ok(ext)
}

/// `<unix millis>-<random>.<ext>`
pub fn unique_file_name(ext: &str) -> String {
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}
