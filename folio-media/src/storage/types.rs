//! Core types for blob storage

use std::fmt;
use thiserror::Error;

/// Errors raised by a blob storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob is stored under the given path
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// I/O error during a storage operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path is empty, absolute, or escapes the storage root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The backend refused the request (credentials, quota, rules)
    #[error("Storage rejected the request: {0}")]
    Rejected(String),

    /// Generic storage error
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A storage path relative to the backend root, e.g. `products/1718-ab12cd34.jpg`
///
/// Paths use `/` separators, never start with `/`, and never contain `..`
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    /// Parses and normalizes a storage path
    ///
    /// Leading and trailing slashes are trimmed and repeated separators are
    /// collapsed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the path is empty or contains a
    /// `.` or `..` segment.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use folio_media::storage::BlobPath;
    ///
    /// let path = BlobPath::parse("/portfolio//cover.jpg").unwrap();
    /// assert_eq!(path.as_str(), "portfolio/cover.jpg");
    /// assert!(BlobPath::parse("../etc/passwd").is_err());
    /// ```
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(StorageError::InvalidPath(raw.to_string()));
        }
        if segments.iter().any(|s| *s == "." || *s == ".." || s.contains('\\')) {
            return Err(StorageError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    /// Joins a folder and a file name into a path
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the joined path is invalid.
    pub fn join(folder: &str, name: &str) -> StorageResult<Self> {
        Self::parse(&format!("{folder}/{name}"))
    }

    /// Returns the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
