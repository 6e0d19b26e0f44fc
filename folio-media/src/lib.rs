//! folio-media: media acquisition pipeline and ordered galleries for the Folio CMS
//!
//! Images reach the site through one path:
//!
//! 1. [`validation`]: size and type gate (5 MiB; JPEG, PNG, WebP)
//! 2. [`crop`]: interactive fixed-aspect crop with zoom and pan
//! 3. [`compress`]: re-encode and resize to a byte and dimension budget
//! 4. [`upload`]: collision-resistant naming, write, resolve URL
//! 5. [`collection`]: ordered galleries with dirty tracking and batched order saves
//!
//! [`reorder`] turns pointer and keyboard gestures into collection moves, and
//! [`pipeline`] wires everything together for the admin forms and the CLI.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use folio_media::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     folio_media::observability::init()?;
//!
//!     let pipeline = MediaPipeline::new(
//!         MediaConfig::default(),
//!         Arc::new(MemoryBlobStorage::new()),
//!         Arc::new(MemoryGalleryStore::new()),
//!     );
//!
//!     let bytes = std::fs::read("screenshot.png")?;
//!     let mut gallery = pipeline.load_gallery("products/acme/screenshots").await?;
//!     pipeline
//!         .ingest(
//!             &mut gallery,
//!             MediaFile::new("screenshot.png", "image/png", bytes),
//!             &CropRequest::default(),
//!             Some("web"),
//!             None,
//!         )
//!         .await?;
//!
//!     pipeline
//!         .publish(&mut gallery, "products/acme", "products/acme/screenshots")
//!         .await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod compress;
pub mod config;
pub mod crop;
pub mod error;
pub mod media;
pub mod observability;
pub mod pipeline;
pub mod reorder;
pub mod storage;
pub mod upload;
pub mod validation;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use folio_media::prelude::*;
    //! ```

    pub use crate::collection::{
        CollectionError, CollectionState, GalleryStore, JsonGalleryStore, MemoryGalleryStore,
        OrderPersistError,
    };
    pub use crate::compress::{CompressionError, CompressionOptions, Compressor, OutputFormat};
    pub use crate::config::MediaConfig;
    pub use crate::crop::{AspectRatio, CropError, CropPhase, CropRect, CropSession, CropSpec};
    pub use crate::error::{MediaError, MediaResult};
    pub use crate::media::{
        AssetId, AssetOrigin, LogoSlot, MediaAsset, MediaBlob, MediaFile, PersistedAsset,
    };
    pub use crate::pipeline::{CropRequest, MediaPipeline};
    pub use crate::reorder::{KeyStep, MoveGesture, ReorderController};
    pub use crate::storage::{
        BlobPath, BlobStorage, LocalBlobStorage, MemoryBlobStorage, StorageError,
    };
    pub use crate::upload::{BatchUploadError, BlobUploader, UploadError};
    pub use crate::validation::{ValidatedFile, ValidationError, Validator};
}
