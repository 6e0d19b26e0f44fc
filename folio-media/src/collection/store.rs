//! Document-store capability for gallery records
//!
//! A gallery is addressed by a key such as `products/acme/screenshots` and
//! stored as the ordered array of [`PersistedAsset`] records. Writing a
//! gallery replaces the whole array in one call.

use crate::media::PersistedAsset;
use crate::storage::BlobPath;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Gallery store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key is empty or escapes the store
    #[error("Invalid gallery key: {0}")]
    InvalidKey(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document is not a valid gallery
    #[error("Malformed gallery document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Store refused or could not take the write
    #[error("Gallery store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for ordered gallery records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Replaces the gallery under `key` with `records` in a single write
    ///
    /// # Errors
    ///
    /// Returns an error if the write does not happen; the previous gallery
    /// is then left as it was.
    async fn save_gallery(&self, key: &str, records: &[PersistedAsset]) -> Result<(), StoreError>;

    /// Loads the gallery under `key`, or an empty list if none was saved
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the document is malformed.
    async fn load_gallery(&self, key: &str) -> Result<Vec<PersistedAsset>, StoreError>;
}

/// In-memory gallery store
#[derive(Debug, Default)]
pub struct MemoryGalleryStore {
    galleries: Mutex<HashMap<String, Vec<PersistedAsset>>>,
    writes: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MemoryGalleryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save_gallery` calls so far
    #[must_use]
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    /// Makes subsequent saves fail (`true`) or succeed (`false`)
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

#[async_trait]
impl GalleryStore for MemoryGalleryStore {
    async fn save_gallery(&self, key: &str, records: &[PersistedAsset]) -> Result<(), StoreError> {
        if *self.fail_saves.lock() {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.galleries.lock().insert(key.to_string(), records.to_vec());
        *self.writes.lock() += 1;
        Ok(())
    }

    async fn load_gallery(&self, key: &str) -> Result<Vec<PersistedAsset>, StoreError> {
        Ok(self.galleries.lock().get(key).cloned().unwrap_or_default())
    }
}

/// Gallery store keeping one pretty-printed JSON document per key
///
/// Key `products/acme/screenshots` lives at
/// `{root}/products/acme/screenshots.json`. Writes go to a temporary file
/// first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonGalleryStore {
    root: PathBuf,
}

impl JsonGalleryStore {
    /// Creates a store rooted at `root`; the directory is created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let key = BlobPath::parse(key).map_err(|_| StoreError::InvalidKey(key.to_string()))?;
        let mut path = self.root.clone();
        let mut segments = key.segments().peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}.json"));
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl GalleryStore for JsonGalleryStore {
    async fn save_gallery(&self, key: &str, records: &[PersistedAsset]) -> Result<(), StoreError> {
        let path = self.document_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(records)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(key, records = records.len(), path = %path.display(), "Gallery written");
        Ok(())
    }

    async fn load_gallery(&self, key: &str) -> Result<Vec<PersistedAsset>, StoreError> {
        let path = self.document_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
