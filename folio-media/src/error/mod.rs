//! Error types and error handling
//!
//! Each stage has its own error enum next to it. [`MediaError`] wraps all of
//! them for callers that drive the whole pipeline.

use crate::collection::{CollectionError, OrderPersistError, StoreError};
use crate::compress::CompressionError;
use crate::crop::CropError;
use crate::storage::StorageError;
use crate::upload::{BatchUploadError, UploadError};
use crate::validation::ValidationError;
use thiserror::Error;

/// Any failure of the media pipeline
#[derive(Debug, Error)]
pub enum MediaError {
    /// The file was refused before anything else ran
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Decoding or rasterizing the crop failed
    #[error(transparent)]
    Crop(#[from] CropError),

    /// Compression failed; the cropped image is still available for retry
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// A single upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A gallery upload batch stopped early
    #[error(transparent)]
    BatchUpload(#[from] BatchUploadError),

    /// Saving gallery order failed; edits are kept
    #[error(transparent)]
    OrderPersist(#[from] OrderPersistError),

    /// Invalid collection edit
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// Storage backend failure outside an upload
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Gallery documents could not be read
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MediaError {
    /// Whether the user can fix this by picking a different file
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Crop(CropError::Decode(_)))
    }
}

/// Result type for pipeline operations
pub type MediaResult<T> = Result<T, MediaError>;
