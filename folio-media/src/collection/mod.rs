//! Ordered asset collections
//!
//! [`CollectionState`] is the in-memory gallery an editor works on: a
//! sequence of [`MediaAsset`]s whose `display_order` always equals its
//! position, plus a dirty flag. Edits never touch storage. Only an explicit
//! [`CollectionState::save_order`] writes the records back, in one batch.
//!
//! # Examples
//!
//! ```rust
//! use folio_media::collection::{CollectionState, MemoryGalleryStore};
//! use folio_media::media::MediaAsset;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut gallery = CollectionState::new();
//! gallery.append(MediaAsset::remote("https://cdn/a.jpg", "web", None));
//! gallery.append(MediaAsset::remote("https://cdn/b.jpg", "web", None));
//! gallery.move_asset(0, 1)?;
//! assert!(gallery.is_dirty());
//!
//! let store = MemoryGalleryStore::new();
//! gallery.save_order(&store, "products/acme/screenshots").await?;
//! assert!(!gallery.is_dirty());
//! # Ok(())
//! # }
//! ```

mod store;

#[cfg(test)]
pub use store::MockGalleryStore;
pub use store::{GalleryStore, JsonGalleryStore, MemoryGalleryStore, StoreError};

use crate::media::{AssetId, MediaAsset, PersistedAsset};
use thiserror::Error;

/// Invalid edit of a collection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// Index is past the end of the collection
    #[error("Index {index} out of range for collection of {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Collection length
        len: usize,
    },

    /// No asset with this id
    #[error("Unknown asset {0}")]
    UnknownAsset(AssetId),
}

/// `save_order` did not persist anything
#[derive(Debug, Error)]
pub enum OrderPersistError {
    /// Some assets have no URL yet
    #[error("{count} asset(s) are still waiting for upload")]
    PendingUploads {
        /// Number of pending assets
        count: usize,
    },

    /// The store write failed
    #[error("Failed to save gallery order: {0}")]
    Store(#[from] StoreError),
}

/// An ordered gallery being edited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    assets: Vec<MediaAsset>,
    dirty: bool,
}

impl CollectionState {
    /// Creates an empty, clean collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a clean collection from persisted records
    ///
    /// Records are sorted by `displayOrder` (ties keep their input order),
    /// then renumbered densely.
    #[must_use]
    pub fn load(mut records: Vec<PersistedAsset>) -> Self {
        records.sort_by_key(|r| r.display_order);
        let mut state = Self {
            assets: records
                .into_iter()
                .map(|r| MediaAsset::remote(r.url, r.category, r.caption))
                .collect(),
            dirty: false,
        };
        state.renormalize();
        state
    }

    /// Assets in visual order
    #[must_use]
    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    /// Number of assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Whether there are edits not yet saved
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Position of an asset
    #[must_use]
    pub fn position(&self, id: AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a.id == id)
    }

    /// Looks up an asset by id
    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Number of assets still holding bytes instead of a URL
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.assets.iter().filter(|a| a.origin.is_pending()).count()
    }

    /// Adds an asset at the end and returns its id
    pub fn append(&mut self, mut asset: MediaAsset) -> AssetId {
        asset.display_order = self.assets.len();
        let id = asset.id;
        self.assets.push(asset);
        self.dirty = true;
        id
    }

    /// Removes an asset by id
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::UnknownAsset` if no asset has this id.
    pub fn remove(&mut self, id: AssetId) -> Result<MediaAsset, CollectionError> {
        let index = self.position(id).ok_or(CollectionError::UnknownAsset(id))?;
        self.remove_at(index)
    }

    /// Removes the asset at `index`
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfRange` if `index >= len`.
    pub fn remove_at(&mut self, index: usize) -> Result<MediaAsset, CollectionError> {
        self.check_index(index)?;
        let removed = self.assets.remove(index);
        self.renormalize();
        self.dirty = true;
        Ok(removed)
    }

    /// Moves the asset at `from` so it ends up at `to`
    ///
    /// Moving an asset onto its own position changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::IndexOutOfRange` if either index is `>= len`.
    pub fn move_asset(&mut self, from: usize, to: usize) -> Result<(), CollectionError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let asset = self.assets.remove(from);
        self.assets.insert(to, asset);
        self.renormalize();
        self.dirty = true;
        Ok(())
    }

    /// Replaces the whole sequence, renumbering it and marking it dirty
    pub fn replace_all(&mut self, assets: Vec<MediaAsset>) {
        self.assets = assets;
        self.renormalize();
        self.dirty = true;
    }

    /// The records `save_order` would write
    ///
    /// # Errors
    ///
    /// Returns `OrderPersistError::PendingUploads` if any asset has no URL.
    pub fn records(&self) -> Result<Vec<PersistedAsset>, OrderPersistError> {
        let records: Vec<PersistedAsset> = self
            .assets
            .iter()
            .filter_map(MediaAsset::to_record)
            .collect();
        if records.len() == self.assets.len() {
            Ok(records)
        } else {
            Err(OrderPersistError::PendingUploads {
                count: self.assets.len() - records.len(),
            })
        }
    }

    /// Writes the current order to `store` under `key` in one batch
    ///
    /// Clears the dirty flag on success. On failure the flag stays set and the
    /// in-memory order is kept, so the user can keep editing and retry.
    ///
    /// # Errors
    ///
    /// See [`OrderPersistError`].
    pub async fn save_order(
        &mut self,
        store: &dyn GalleryStore,
        key: &str,
    ) -> Result<usize, OrderPersistError> {
        let records = self.records()?;
        match store.save_gallery(key, &records).await {
            Ok(()) => {
                self.dirty = false;
                tracing::info!(key, assets = records.len(), "Gallery order saved");
                Ok(records.len())
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Gallery order not saved; edits kept");
                Err(e.into())
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<(), CollectionError> {
        if index < self.assets.len() {
            Ok(())
        } else {
            Err(CollectionError::IndexOutOfRange {
                index,
                len: self.assets.len(),
            })
        }
    }

    fn renormalize(&mut self) {
        for (order, asset) in self.assets.iter_mut().enumerate() {
            asset.display_order = order;
        }
    }
}
