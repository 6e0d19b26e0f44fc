//! Local filesystem storage implementation

use super::traits::BlobStorage;
use super::types::{BlobPath, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Sidecar metadata written next to each stored blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Storage path relative to the root
    pub path: String,

    /// MIME content type supplied at upload time
    pub content_type: String,

    /// Blob size in bytes
    pub size: u64,

    /// When the blob was written
    pub stored_at: DateTime<Utc>,
}

/// Local filesystem storage backend
///
/// Blobs are written under `root` at exactly their storage path, so the
/// directory can be served statically at `public_base_url`.
///
/// # Directory Structure
///
/// ```text
/// /var/folio/uploads/
/// ├── products/
/// │   ├── 1718000000000-ab12cd34.jpg
/// │   └── .1718000000000-ab12cd34.jpg.json
/// └── portfolio/
///     └── 1718000000123-x9y8z7w6.jpg
/// ```
///
/// # Examples
///
/// ```rust,no_run
/// use folio_media::storage::LocalBlobStorage;
/// use std::path::PathBuf;
///
/// let storage = LocalBlobStorage::new(PathBuf::from("/var/folio/uploads"), "/uploads")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    /// Base directory for blob storage
    root: PathBuf,

    /// URL prefix the root is served under, without trailing slash
    public_base_url: String,
}

impl LocalBlobStorage {
    /// Creates a new local storage instance
    ///
    /// The root directory is created lazily on first write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if `root` exists and is not a
    /// directory.
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> StorageResult<Self> {
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            root,
            public_base_url,
        })
    }

    /// Returns the storage root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &BlobPath) -> PathBuf {
        path.segments()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn metadata_path(&self, path: &BlobPath) -> PathBuf {
        let file_path = self.file_path(path);
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        file_path.with_file_name(format!(".{name}.json"))
    }

    fn url_for(&self, path: &BlobPath) -> String {
        format!("{}/{}", self.public_base_url, path)
    }

    fn path_from_url(&self, url: &str) -> StorageResult<BlobPath> {
        let relative = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                StorageError::InvalidPath(format!("{url} is not served by this storage"))
            })?;
        BlobPath::parse(relative)
    }

    /// Reads the sidecar metadata of a stored blob
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no blob is stored under `path`.
    pub async fn metadata(&self, path: &BlobPath) -> StorageResult<BlobMetadata> {
        let metadata_path = self.metadata_path(path);
        if !metadata_path.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let json = fs::read_to_string(&metadata_path).await?;
        serde_json::from_str(&json)
            .map_err(|e| StorageError::Other(format!("Failed to parse metadata: {e}")))
    }

    async fn write_blob(
        &self,
        mut file: fs::File,
        data: &[u8],
        content_type: &str,
        path: &BlobPath,
    ) -> StorageResult<()> {
        file.write_all(data).await?;
        file.flush().await?;

        let metadata = BlobMetadata {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            stored_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::Other(format!("Failed to serialize metadata: {e}")))?;
        fs::write(self.metadata_path(path), json).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        path: &BlobPath,
    ) -> StorageResult<String> {
        let file_path = self.file_path(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // create_new: a generated name must never replace an existing blob
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await?;

        // From here on the file is ours; a failed write must not leave it behind
        if let Err(e) = self.write_blob(file, &data, content_type, path).await {
            if let Err(cleanup) = fs::remove_file(&file_path).await {
                tracing::warn!(path = %path, error = %cleanup, "Failed to remove partial blob");
            }
            let _ = fs::remove_file(self.metadata_path(path)).await;
            return Err(e);
        }

        tracing::debug!(path = %path, size = data.len(), "Blob written to local storage");
        Ok(self.url_for(path))
    }

    async fn resolve_url(&self, path: &BlobPath) -> StorageResult<String> {
        if !self.file_path(path).is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.url_for(path))
    }

    async fn delete_url(&self, url: &str) -> StorageResult<()> {
        let path = self.path_from_url(url)?;

        let file_path = self.file_path(&path);
        if file_path.exists() {
            fs::remove_file(&file_path).await?;
        }
        let metadata_path = self.metadata_path(&path);
        if metadata_path.exists() {
            fs::remove_file(&metadata_path).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (LocalBlobStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(temp_dir.path().to_path_buf(), "/uploads/").unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_resolve() {
        let (storage, temp) = create_test_storage();
        let path = BlobPath::parse("products/logo.png").unwrap();

        let put_url = storage.put(b"png bytes".to_vec(), "image/png", &path).await.unwrap();
        let resolved = storage.resolve_url(&path).await.unwrap();

        assert_eq!(put_url, "/uploads/products/logo.png");
        assert_eq!(resolved, put_url);
        let on_disk = std::fs::read(temp.path().join("products").join("logo.png")).unwrap();
        assert_eq!(on_disk, b"png bytes");
    }

    #[tokio::test]
    async fn test_put_refuses_overwrite() {
        let (storage, temp) = create_test_storage();
        let path = BlobPath::parse("products/logo.png").unwrap();

        storage.put(b"first".to_vec(), "image/png", &path).await.unwrap();
        let result = storage.put(b"second".to_vec(), "image/png", &path).await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        let kept = std::fs::read(temp.path().join("products").join("logo.png")).unwrap();
        assert_eq!(kept, b"first");
    }

    #[tokio::test]
    async fn test_put_removes_blob_when_sidecar_fails() {
        let (storage, temp) = create_test_storage();
        let path = BlobPath::parse("products/shot.jpg").unwrap();

        // A directory where the sidecar should go makes the metadata write fail
        let sidecar = temp.path().join("products").join(".shot.jpg.json");
        std::fs::create_dir_all(&sidecar).unwrap();

        let result = storage.put(b"jpeg bytes".to_vec(), "image/jpeg", &path).await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!temp.path().join("products").join("shot.jpg").exists());
        assert!(matches!(
            storage.resolve_url(&path).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let (storage, _temp) = create_test_storage();
        let path = BlobPath::parse("products/missing.jpg").unwrap();

        let result = storage.resolve_url(&path).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_metadata_sidecar() {
        let (storage, _temp) = create_test_storage();
        let path = BlobPath::parse("portfolio/cover.jpg").unwrap();

        storage.put(vec![1, 2, 3, 4], "image/jpeg", &path).await.unwrap();
        let metadata = storage.metadata(&path).await.unwrap();

        assert_eq!(metadata.path, "portfolio/cover.jpg");
        assert_eq!(metadata.content_type, "image/jpeg");
        assert_eq!(metadata.size, 4);
    }

    #[tokio::test]
    async fn test_delete_url_is_idempotent() {
        let (storage, temp) = create_test_storage();
        let path = BlobPath::parse("portfolio/cover.jpg").unwrap();
        let url = storage.put(vec![9; 16], "image/jpeg", &path).await.unwrap();

        storage.delete_url(&url).await.unwrap();
        assert!(!temp.path().join("portfolio").join("cover.jpg").exists());
        assert!(storage.metadata(&path).await.is_err());

        storage.delete_url(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_foreign_url() {
        let (storage, _temp) = create_test_storage();

        let result = storage.delete_url("https://cdn.example.com/a.jpg").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not-a-directory");
        std::fs::write(&file_path, b"test").unwrap();

        let result = LocalBlobStorage::new(file_path, "/uploads");
        assert!(matches!(result.unwrap_err(), StorageError::InvalidPath(_)));
    }
}
