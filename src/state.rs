use std::sync::Arc;

use crate::config::{AppConfig, UploadStorageKind};
use crate::db::{CourseStore, StoreError};
use crate::upload::{ImageStorage, LocalDiskStorage, PlaceholderStorage};

/// URL prefix the upload directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CourseStore>,
    pub images: Arc<dyn ImageStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Opens (and seeds if needed) the store and picks the image backend.
    pub async fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let db = CourseStore::open(&config.data_file).await?;

        let images: Arc<dyn ImageStorage> = match config.upload_storage {
            UploadStorageKind::Local => Arc::new(LocalDiskStorage::new(
                config.upload_dir.clone(),
                UPLOADS_URL_PREFIX,
            )),
            UploadStorageKind::Placeholder => Arc::new(PlaceholderStorage::default()),
        };

        Ok(Self {
            db: Arc::new(db),
            images,
            config: Arc::new(config),
        })
    }
}
