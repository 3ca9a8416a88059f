use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::fs;
use tracing::info;

use super::UploadError;
use crate::models::DEFAULT_THUMBNAIL;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub url: String,
    /// Extra information for the client, e.g. that the file was not kept.
    pub note: Option<String>,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn store(&self, file_name: &str, bytes: Bytes) -> Result<StoredImage, UploadError>;
}

/// Writes images into a directory that is served back under `url_prefix`.
pub struct LocalDiskStorage {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStorage for LocalDiskStorage {
    async fn store(&self, file_name: &str, bytes: Bytes) -> Result<StoredImage, UploadError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| UploadError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;

        let path = self.dir.join(file_name);
        fs::write(&path, &bytes)
            .await
            .map_err(|source| UploadError::Io {
                path: path.display().to_string(),
                source,
            })?;

        info!("stored image {} ({} bytes)", path.display(), bytes.len());
        Ok(StoredImage {
            url: format!("{}/{}", self.url_prefix, file_name),
            note: None,
        })
    }
}

/// For deployments without a persistent filesystem: the upload is validated
/// by the caller, then discarded, and the placeholder URL is returned.
pub struct PlaceholderStorage {
    url: String,
}

impl PlaceholderStorage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for PlaceholderStorage {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL)
    }
}

#[async_trait]
impl ImageStorage for PlaceholderStorage {
    async fn store(&self, file_name: &str, bytes: Bytes) -> Result<StoredImage, UploadError> {
        info!("discarding image {} ({} bytes)", file_name, bytes.len());
        Ok(StoredImage {
            url: self.url.clone(),
            note: Some(
                "Images are not persisted in this deployment; configure external storage to keep uploads"
                    .to_string(),
            ),
        })
    }
}
