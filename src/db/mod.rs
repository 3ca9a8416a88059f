pub mod repository;

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::CourseDocument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode store document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Flat-file course store.
///
/// The whole document lives in one pretty-printed JSON file and is read fully
/// on every call. Mutations hold `write_lock` from read to rename, so two
/// concurrent writers can no longer interleave and drop each other's changes.
pub struct CourseStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CourseStore {
    /// Opens the store at `path`, creating parent directories and seeding the
    /// document if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        let guard = store.write_lock.lock().await;
        match store.load().await? {
            Some(doc) => info!(
                "opened course store at {} ({} courses, next id {})",
                store.path.display(),
                doc.courses.len(),
                doc.next_id
            ),
            None => {
                store.seed().await?;
            }
        }
        drop(guard);

        Ok(store)
    }

    /// Reads the current document, reseeding it if the file has gone missing.
    pub async fn read(&self) -> Result<CourseDocument, StoreError> {
        if let Some(doc) = self.load().await? {
            return Ok(doc);
        }

        let _guard = self.write_lock.lock().await;
        self.load_or_seed().await
    }

    /// Runs `f` against the document under the write lock and persists the result.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut CourseDocument) -> T,
    {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load_or_seed().await?;
        let out = f(&mut doc);
        self.save(&doc).await?;

        Ok(out)
    }

    /// Like [`mutate`](Self::mutate), but nothing is written when `f` returns `None`.
    pub async fn try_mutate<T, F>(&self, f: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut CourseDocument) -> Option<T>,
    {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load_or_seed().await?;
        let Some(out) = f(&mut doc) else {
            return Ok(None);
        };
        self.save(&doc).await?;

        Ok(Some(out))
    }

    /// Caller must hold `write_lock`.
    async fn load_or_seed(&self) -> Result<CourseDocument, StoreError> {
        match self.load().await? {
            Some(doc) => Ok(doc),
            None => {
                warn!("course store {} disappeared, reseeding", self.path.display());
                self.seed().await
            }
        }
    }

    /// `None` when the file does not exist.
    async fn load(&self) -> Result<Option<CourseDocument>, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut doc: CourseDocument =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if doc.repair_next_id() {
            warn!(
                "nextId in {} was behind existing ids, raised to {}",
                self.path.display(),
                doc.next_id
            );
        }

        Ok(Some(doc))
    }

    /// Caller must hold `write_lock`.
    async fn seed(&self) -> Result<CourseDocument, StoreError> {
        let doc = CourseDocument::seeded();
        self.save(&doc).await?;
        info!("seeded course store at {}", self.path.display());
        Ok(doc)
    }

    /// Writes to a uniquely named sibling temp file and renames it into place.
    /// Caller must hold `write_lock`.
    async fn save(&self, doc: &CourseDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let body = serde_json::to_string_pretty(doc)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));

        if let Err(source) = fs::write(&tmp, body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Write { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_seeds_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("courses.json");

        let store = CourseStore::open(&path).await.expect("Failed to open store");
        let doc = store.read().await.unwrap();

        assert!(path.exists());
        assert_eq!(doc.courses.len(), 1);
        assert_eq!(doc.courses[0].id, 1);
        assert!(doc.courses[0].featured);
        assert_eq!(doc.next_id, 2);
    }

    #[tokio::test]
    async fn test_open_keeps_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        std::fs::write(&path, r#"{"courses":[],"nextId":41}"#).unwrap();

        let store = CourseStore::open(&path).await.unwrap();
        let doc = store.read().await.unwrap();

        assert!(doc.courses.is_empty());
        assert_eq!(doc.next_id, 41);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = CourseStore::open(&path).await.err().expect("open should fail");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_try_mutate_none_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        let store = CourseStore::open(&path).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let out: Option<()> = store
            .try_mutate(|doc| {
                doc.courses.clear();
                None
            })
            .await
            .unwrap();

        assert!(out.is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_document_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        CourseStore::open(&path).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"courses\": ["));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "courses.json")
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_read_reseeds_deleted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        let store = CourseStore::open(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let doc = store.read().await.expect("Failed to read store");

        assert!(path.exists());
        assert_eq!(doc.courses.len(), 1);
        assert_eq!(doc.courses[0].id, 1);
        assert_eq!(doc.next_id, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reseed_does_not_clobber_concurrent_insert() {
        use std::sync::Arc;

        use crate::db::repository;
        use crate::models::NewCourseRequest;

        for _ in 0..50 {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("courses.json");
            let store = Arc::new(CourseStore::open(&path).await.unwrap());
            std::fs::remove_file(&path).unwrap();

            let mut readers = Vec::new();
            for _ in 0..4 {
                let store = store.clone();
                readers.push(tokio::spawn(async move { store.read().await }));
            }
            let writer = {
                let store = store.clone();
                tokio::spawn(async move {
                    repository::insert_course(
                        &store,
                        NewCourseRequest {
                            name: Some("kept".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
                })
            };

            for reader in readers {
                reader.await.unwrap().expect("Failed to read store");
            }
            let course = writer.await.unwrap().expect("Failed to insert course");

            let doc = store.read().await.unwrap();
            assert!(
                doc.courses.iter().any(|c| c.id == course.id),
                "inserted course {} was lost",
                course.id
            );
        }
    }
}
