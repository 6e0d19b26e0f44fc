//! Blob storage abstraction and implementations
//!
//! The pipeline talks to blob storage only through the [`BlobStorage`] trait,
//! injected as an `Arc<dyn BlobStorage>`. Two backends ship with the crate:
//! - [`LocalBlobStorage`]: files on disk, served under a public URL prefix
//! - [`MemoryBlobStorage`]: in-process map with fault injection
//!
//! # Examples
//!
//! ```rust,no_run
//! use folio_media::storage::{BlobPath, BlobStorage, LocalBlobStorage};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let storage: Arc<dyn BlobStorage> =
//!     Arc::new(LocalBlobStorage::new(PathBuf::from("./uploads"), "/uploads")?);
//!
//! let path = BlobPath::parse("team/portrait.jpg")?;
//! storage.put(vec![/* ... */], "image/jpeg", &path).await?;
//! let url = storage.resolve_url(&path).await?;
//! # Ok(())
//! # }
//! ```

mod local;
mod memory;
mod traits;
mod types;

pub use local::{BlobMetadata, LocalBlobStorage};
pub use memory::MemoryBlobStorage;
#[cfg(test)]
pub use traits::MockBlobStorage;
pub use traits::BlobStorage;
pub use types::{BlobPath, StorageError, StorageResult};
