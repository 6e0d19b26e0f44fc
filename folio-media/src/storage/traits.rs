//! Blob storage trait definitions

use super::types::{BlobPath, StorageResult};
use async_trait::async_trait;

/// Abstraction over the blob storage service that holds uploaded media
///
/// The pipeline depends only on this capability, never on a concrete
/// provider. Backends accept arbitrary caller-chosen paths and hand back a
/// public-readable URL.
///
/// # Implementation Requirements
///
/// Implementations must:
/// - Overwrite nothing silently: callers generate unique paths, backends store
///   bytes exactly under the path they are given
/// - Be safe to share between tasks (`Send + Sync`)
/// - Treat `delete_url` on an unknown URL as success
///
/// # Examples
///
/// ```rust,no_run
/// use folio_media::storage::{BlobPath, BlobStorage, LocalBlobStorage};
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let storage = LocalBlobStorage::new(PathBuf::from("/var/folio/uploads"), "/uploads")?;
///
/// let path = BlobPath::parse("products/1718000000000-ab12cd34.jpg")?;
/// storage.put(vec![0xFF, 0xD8, 0xFF], "image/jpeg", &path).await?;
///
/// let url = storage.resolve_url(&path).await?;
/// assert_eq!(url, "/uploads/products/1718000000000-ab12cd34.jpg");
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Writes `data` under `path` and returns the URL reported by the backend
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is not acceptable to the backend
    /// - The backend is unavailable or rejects the write
    /// - I/O fails
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        path: &BlobPath,
    ) -> StorageResult<String>;

    /// Resolves the durable public URL for a stored blob
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing is stored under `path`, or
    /// a backend error if the URL cannot be produced.
    async fn resolve_url(&self, path: &BlobPath) -> StorageResult<String>;

    /// Deletes the blob a previously resolved URL points at
    ///
    /// Idempotent: unknown URLs are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not one this backend issued or the
    /// backend fails to delete.
    async fn delete_url(&self, url: &str) -> StorageResult<()>;
}
