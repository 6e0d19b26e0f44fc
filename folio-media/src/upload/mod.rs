//! Uniquely-named blob uploads
//!
//! Every upload gets a fresh storage name of the form
//! `{folder}/{unix_millis}-{8 random alphanumerics}.{ext}`, so files that
//! share an original filename never overwrite each other, even within one
//! batch or one millisecond.
//!
//! An upload is two calls against the storage backend: write the bytes, then
//! resolve the durable URL. Only a URL that made it through both is ever
//! returned to the caller.
//!
//! # Batches
//!
//! [`BlobUploader::upload_batch`] uploads sequentially and stops at the first
//! failure. Blobs already written earlier in that batch are not deleted and
//! are not referenced by anything: they are reported in
//! [`BatchUploadError::orphaned`] so callers can log or clean them up.

use crate::media::MediaBlob;
use crate::storage::{BlobPath, BlobStorage, StorageError};
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use thiserror::Error;

/// Length of the random part of generated names
const SUFFIX_LEN: usize = 8;

/// Failure of a single upload
#[derive(Debug, Error)]
pub enum UploadError {
    /// The folder or generated name is not a valid storage path
    #[error("Invalid upload destination: {0}")]
    InvalidDestination(#[source] StorageError),

    /// Writing the bytes failed; nothing was stored
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Generated storage path
        path: String,
        /// Backend error
        #[source]
        source: StorageError,
    },

    /// The bytes were written but no URL could be resolved; the blob is orphaned
    #[error("Stored {path} but failed to resolve its URL: {source}")]
    Resolve {
        /// Storage path of the orphaned blob
        path: String,
        /// Backend error
        #[source]
        source: StorageError,
    },
}

impl UploadError {
    /// Path of a blob this failure left behind in storage
    #[must_use]
    pub fn orphaned_path(&self) -> Option<&str> {
        match self {
            Self::Resolve { path, .. } => Some(path),
            Self::InvalidDestination(_) | Self::Write { .. } => None,
        }
    }
}

/// A batch stopped at its first failed upload
#[derive(Debug, Error)]
#[error("Upload {failed_index} of batch failed ({} blob(s) orphaned): {source}", orphaned.len())]
pub struct BatchUploadError {
    /// Zero-based position of the failed item
    pub failed_index: usize,

    /// Storage paths written by this batch that nothing references
    pub orphaned: Vec<String>,

    /// The failure that aborted the batch
    #[source]
    pub source: UploadError,
}

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    /// Storage path the bytes were written to
    pub path: String,

    /// Durable public URL
    pub url: String,
}

/// Writes blobs under collision-resistant names
#[derive(Clone)]
pub struct BlobUploader {
    storage: Arc<dyn BlobStorage>,
}

impl BlobUploader {
    /// Creates an uploader over an injected storage backend
    #[must_use]
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self { storage }
    }

    /// The storage backend
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.storage
    }

    /// Uploads `blob` into `folder` and returns its URL
    ///
    /// # Errors
    ///
    /// See [`UploadError`]; only `UploadError::Resolve` leaves bytes behind.
    pub async fn upload(&self, blob: &MediaBlob, folder: &str) -> Result<String, UploadError> {
        self.upload_detailed(blob, folder).await.map(|uploaded| uploaded.url)
    }

    /// Like [`BlobUploader::upload`], also returning the storage path
    ///
    /// # Errors
    ///
    /// See [`UploadError`].
    pub async fn upload_detailed(
        &self,
        blob: &MediaBlob,
        folder: &str,
    ) -> Result<UploadedBlob, UploadError> {
        let path = BlobPath::join(folder, &generate_name(&blob.content_type))
            .map_err(UploadError::InvalidDestination)?;

        self.storage
            .put(blob.data.clone(), &blob.content_type, &path)
            .await
            .map_err(|source| UploadError::Write {
                path: path.to_string(),
                source,
            })?;

        let url = match self.storage.resolve_url(&path).await {
            Ok(url) => url,
            Err(source) => {
                tracing::warn!(
                    path = %path,
                    error = %source,
                    "Blob stored but URL unresolved; blob is orphaned"
                );
                return Err(UploadError::Resolve {
                    path: path.to_string(),
                    source,
                });
            }
        };

        tracing::info!(path = %path, bytes = blob.size(), "Blob uploaded");
        Ok(UploadedBlob {
            path: path.to_string(),
            url,
        })
    }

    /// Uploads `blobs` one after another, aborting on the first failure
    ///
    /// Returns the URLs in input order.
    ///
    /// # Errors
    ///
    /// Returns [`BatchUploadError`] naming the failed index and every blob
    /// the batch left unreferenced in storage.
    pub async fn upload_batch(
        &self,
        blobs: &[&MediaBlob],
        folder: &str,
    ) -> Result<Vec<String>, BatchUploadError> {
        let mut uploaded: Vec<UploadedBlob> = Vec::with_capacity(blobs.len());

        for (index, blob) in blobs.iter().enumerate() {
            match self.upload_detailed(blob, folder).await {
                Ok(done) => uploaded.push(done),
                Err(source) => {
                    let mut orphaned: Vec<String> = uploaded.into_iter().map(|u| u.path).collect();
                    orphaned.extend(source.orphaned_path().map(str::to_string));
                    tracing::warn!(
                        failed_index = index,
                        orphaned = orphaned.len(),
                        error = %source,
                        "Batch upload aborted"
                    );
                    return Err(BatchUploadError {
                        failed_index: index,
                        orphaned,
                        source,
                    });
                }
            }
        }

        Ok(uploaded.into_iter().map(|u| u.url).collect())
    }

    /// Deletes a superseded blob, logging instead of failing
    ///
    /// Returns whether the deletion succeeded.
    pub async fn discard(&self, url: &str) -> bool {
        match self.storage.delete_url(url).await {
            Ok(()) => {
                tracing::debug!(url, "Superseded blob deleted");
                true
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to delete superseded blob");
                false
            }
        }
    }
}

/// Generates `{unix_millis}-{random}.{ext}` for a content type
#[must_use]
pub fn generate_name(content_type: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        suffix.to_ascii_lowercase(),
        extension_for(content_type)
    )
}

/// File extension for an image content type
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/avif" => "avif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStorage, MockBlobStorage};
    use std::collections::HashSet;

    fn jpeg_blob(byte: u8) -> MediaBlob {
        MediaBlob::new("image/jpeg", vec![byte; 32])
    }

    #[test]
    fn test_generate_name_shape() {
        let name = generate_name("image/webp");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        let (millis, suffix) = stem.split_once('-').unwrap();

        assert_eq!(ext, "webp");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_names_unique_within_a_millisecond() {
        let names: HashSet<String> = (0..1_000).map(|_| generate_name("image/jpeg")).collect();
        assert_eq!(names.len(), 1_000);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("IMAGE/PNG; charset=binary"), "png");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn test_upload_into_folder() {
        let storage = Arc::new(MemoryBlobStorage::new());
        let uploader = BlobUploader::new(storage.clone());

        let url = uploader.upload(&jpeg_blob(1), "products").await.unwrap();

        assert!(url.starts_with("memory://blobs/products/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_files_get_distinct_urls() {
        let storage = Arc::new(MemoryBlobStorage::new());
        let uploader = BlobUploader::new(storage.clone());
        let blob = jpeg_blob(3);

        let urls = uploader.upload_batch(&[&blob, &blob, &blob], "portfolio").await.unwrap();

        let distinct: HashSet<&String> = urls.iter().collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn test_write_failure_produces_no_url() {
        let mut storage = MockBlobStorage::new();
        storage
            .expect_put()
            .times(1)
            .returning(|_, _, _| Err(StorageError::Rejected("quota".to_string())));
        storage.expect_resolve_url().never();
        let uploader = BlobUploader::new(Arc::new(storage));

        let err = uploader.upload(&jpeg_blob(0), "products").await.unwrap_err();

        assert!(matches!(err, UploadError::Write { .. }));
        assert!(err.orphaned_path().is_none());
    }

    #[tokio::test]
    async fn test_resolve_failure_reports_orphan() {
        let mut storage = MockBlobStorage::new();
        storage
            .expect_put()
            .times(1)
            .returning(|_, _, path| Ok(format!("https://cdn/{path}")));
        storage
            .expect_resolve_url()
            .times(1)
            .returning(|_| Err(StorageError::Other("token expired".to_string())));
        let uploader = BlobUploader::new(Arc::new(storage));

        let err = uploader.upload(&jpeg_blob(0), "products").await.unwrap_err();

        let orphan = err.orphaned_path().unwrap();
        assert!(orphan.starts_with("products/"));
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_failure() {
        let storage = Arc::new(MemoryBlobStorage::new());
        storage.fail_puts_after(1);
        let uploader = BlobUploader::new(storage.clone());
        let (a, b, c) = (jpeg_blob(1), jpeg_blob(2), jpeg_blob(3));

        let err = uploader.upload_batch(&[&a, &b, &c], "gallery").await.unwrap_err();

        assert_eq!(err.failed_index, 1);
        assert_eq!(err.orphaned.len(), 1);
        assert!(matches!(err.source, UploadError::Write { .. }));
        // the third file is never attempted
        assert_eq!(storage.len(), 1);
        assert!(storage.contains(&BlobPath::parse(&err.orphaned[0]).unwrap()));
    }

    #[tokio::test]
    async fn test_invalid_folder() {
        let uploader = BlobUploader::new(Arc::new(MemoryBlobStorage::new()));
        let err = uploader.upload(&jpeg_blob(0), "../outside").await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidDestination(_)));
    }

    #[tokio::test]
    async fn test_discard_is_best_effort() {
        let storage = Arc::new(MemoryBlobStorage::new());
        let uploader = BlobUploader::new(storage.clone());
        let url = uploader.upload(&jpeg_blob(1), "logos").await.unwrap();

        storage.fail_deletes();
        assert!(!uploader.discard(&url).await);
        assert_eq!(storage.len(), 1);

        storage.heal();
        assert!(uploader.discard(&url).await);
        assert!(storage.is_empty());
    }
}
