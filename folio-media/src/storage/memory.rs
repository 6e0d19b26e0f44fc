//! In-process storage backend
//!
//! Keeps blobs in a map behind a lock. Useful for dry runs and for exercising
//! failure paths: writes and URL resolution can be told to start failing.

use super::traits::BlobStorage;
use super::types::{BlobPath, StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Faults {
    /// Number of writes allowed to succeed before every write fails
    puts_before_failure: Option<usize>,
    fail_resolve: bool,
    fail_delete: bool,
}

/// In-memory blob storage with fault injection
///
/// # Examples
///
/// ```rust
/// use folio_media::storage::{BlobPath, BlobStorage, MemoryBlobStorage};
///
/// # async fn example() -> anyhow::Result<()> {
/// let storage = MemoryBlobStorage::new();
/// storage.fail_puts_after(1);
///
/// let first = BlobPath::parse("a/1.jpg")?;
/// let second = BlobPath::parse("a/2.jpg")?;
/// assert!(storage.put(vec![1], "image/jpeg", &first).await.is_ok());
/// assert!(storage.put(vec![2], "image/jpeg", &second).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryBlobStorage {
    base_url: String,
    blobs: Mutex<BTreeMap<BlobPath, StoredBlob>>,
    faults: Mutex<Faults>,
}

impl Default for MemoryBlobStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStorage {
    /// Creates an empty store issuing `memory://` URLs
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url("memory://blobs")
    }

    /// Creates an empty store issuing URLs under `base_url`
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Lets the next `successes` writes succeed, then fails every write
    pub fn fail_puts_after(&self, successes: usize) {
        self.faults.lock().puts_before_failure = Some(successes);
    }

    /// Makes every URL resolution fail
    pub fn fail_resolves(&self) {
        self.faults.lock().fail_resolve = true;
    }

    /// Makes every deletion fail
    pub fn fail_deletes(&self) {
        self.faults.lock().fail_delete = true;
    }

    /// Clears all injected faults
    pub fn heal(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Number of stored blobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Whether the store holds no blobs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Whether a blob is stored under `path`
    #[must_use]
    pub fn contains(&self, path: &BlobPath) -> bool {
        self.blobs.lock().contains_key(path)
    }

    /// Stored paths in lexical order
    #[must_use]
    pub fn paths(&self) -> Vec<BlobPath> {
        self.blobs.lock().keys().cloned().collect()
    }

    /// Bytes and content type stored under `path`
    #[must_use]
    pub fn get(&self, path: &BlobPath) -> Option<(String, Vec<u8>)> {
        self.blobs
            .lock()
            .get(path)
            .map(|blob| (blob.content_type.clone(), blob.data.clone()))
    }

    fn url_for(&self, path: &BlobPath) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        path: &BlobPath,
    ) -> StorageResult<String> {
        {
            let mut faults = self.faults.lock();
            if let Some(remaining) = faults.puts_before_failure.as_mut() {
                if *remaining == 0 {
                    return Err(StorageError::Rejected(format!("write refused for {path}")));
                }
                *remaining -= 1;
            }
        }

        let mut blobs = self.blobs.lock();
        if blobs.contains_key(path) {
            return Err(StorageError::Rejected(format!("{path} already exists")));
        }
        blobs.insert(
            path.clone(),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(self.url_for(path))
    }

    async fn resolve_url(&self, path: &BlobPath) -> StorageResult<String> {
        if self.faults.lock().fail_resolve {
            return Err(StorageError::Other(format!("URL resolution failed for {path}")));
        }
        if !self.blobs.lock().contains_key(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.url_for(path))
    }

    async fn delete_url(&self, url: &str) -> StorageResult<()> {
        if self.faults.lock().fail_delete {
            return Err(StorageError::Other(format!("delete failed for {url}")));
        }
        let relative = url
            .strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath(url.to_string()))?;
        let path = BlobPath::parse(relative)?;
        self.blobs.lock().remove(&path);
        Ok(())
    }
}
