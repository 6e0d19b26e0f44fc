//! End-to-end media pipeline
//!
//! [`MediaPipeline`] wires the stages together the way the admin forms use
//! them:
//!
//! ```text
//! MediaFile ─validate─▶ CropSession ─commit─▶ MediaBlob ─compress─▶ MediaBlob
//!                                                                    │
//!        gallery: stage as pending asset ─▶ upload_pending ─▶ save_order
//!        logo:    upload ─▶ discard superseded blob
//! ```
//!
//! Reordering and removal happen directly on the [`CollectionState`] and
//! never reach the pipeline.

use crate::collection::{CollectionState, GalleryStore, JsonGalleryStore};
use crate::compress::{CompressionOptions, Compressor};
use crate::config::MediaConfig;
use crate::crop::{AspectRatio, CropRect, CropSession};
use crate::error::MediaResult;
use crate::media::{AssetId, AssetOrigin, LogoSlot, MediaAsset, MediaBlob, MediaFile};
use crate::storage::{BlobStorage, LocalBlobStorage};
use crate::upload::BlobUploader;
use crate::validation::Validator;
use std::sync::Arc;

/// Non-interactive crop adjustments, applied in field order
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CropRequest {
    /// Zoom factor, clamped to `[1, 3]`
    pub zoom: Option<f64>,

    /// Pan in natural pixels after zooming
    pub pan: Option<(f64, f64)>,

    /// Explicit rectangle; overrides zoom and pan
    pub rect: Option<CropRect>,
}

/// Orchestrates validation, crop, compression, upload and persistence
#[derive(Clone)]
pub struct MediaPipeline {
    config: MediaConfig,
    validator: Validator,
    compressor: Compressor,
    uploader: BlobUploader,
    galleries: Arc<dyn GalleryStore>,
}

impl MediaPipeline {
    /// Creates a pipeline over injected backends
    #[must_use]
    pub fn new(
        config: MediaConfig,
        storage: Arc<dyn BlobStorage>,
        galleries: Arc<dyn GalleryStore>,
    ) -> Self {
        Self {
            validator: Validator::new(config.validation.clone()),
            compressor: Compressor::new(),
            uploader: BlobUploader::new(storage),
            galleries,
            config,
        }
    }

    /// Creates a pipeline over the filesystem backends named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root is not an existing directory.
    pub fn from_config(config: MediaConfig) -> MediaResult<Self> {
        let storage = LocalBlobStorage::new(
            config.storage.root.clone(),
            config.storage.public_base_url.clone(),
        )?;
        let galleries = JsonGalleryStore::new(config.gallery.store_root.clone());
        Ok(Self::new(config, Arc::new(storage), Arc::new(galleries)))
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// The validator gating every upload
    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The uploader
    #[must_use]
    pub const fn uploader(&self) -> &BlobUploader {
        &self.uploader
    }

    /// Validates `file` and opens a crop session on it
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Validation` without creating a session if the
    /// file is refused, or `MediaError::Crop` if it cannot be decoded.
    pub fn start_crop(&self, file: MediaFile, aspect: AspectRatio) -> MediaResult<CropSession> {
        let validated = self.validator.admit(file)?;
        let mut session = CropSession::with_quality(aspect, self.config.crop.output_quality);
        session.begin(validated)?;
        Ok(session)
    }

    /// Validates, crops and commits `file` in one step
    ///
    /// # Errors
    ///
    /// Returns the validation or crop failure.
    pub fn crop(
        &self,
        file: MediaFile,
        aspect: AspectRatio,
        request: &CropRequest,
    ) -> MediaResult<MediaBlob> {
        let mut session = self.start_crop(file, aspect)?;
        if let Some(rect) = request.rect {
            session.select(rect)?;
        } else {
            if let Some(zoom) = request.zoom {
                session.set_zoom(zoom)?;
            }
            if let Some((dx, dy)) = request.pan {
                session.pan(dx, dy)?;
            }
        }
        Ok(session.commit()?)
    }

    /// Compresses a cropped image with the gallery preset
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Compression`; `cropped` stays usable for a retry.
    pub async fn prepare_gallery_image(&self, cropped: &MediaBlob) -> MediaResult<MediaBlob> {
        self.prepare(cropped, &self.config.compression.gallery).await
    }

    /// Compresses a cropped image with the thumbnail preset
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Compression`; `cropped` stays usable for a retry.
    pub async fn prepare_logo(&self, cropped: &MediaBlob) -> MediaResult<MediaBlob> {
        self.prepare(cropped, &self.config.compression.thumbnail).await
    }

    async fn prepare(
        &self,
        cropped: &MediaBlob,
        options: &CompressionOptions,
    ) -> MediaResult<MediaBlob> {
        let compressed = self.compressor.compress(cropped, options).await?;
        tracing::debug!(
            before = cropped.size(),
            after = compressed.size(),
            limit = options.max_bytes,
            "Image prepared"
        );
        Ok(compressed)
    }

    /// Appends `blob` to `collection` as a pending asset
    ///
    /// Uses the configured default category when `category` is `None`.
    pub fn stage(
        &self,
        collection: &mut CollectionState,
        blob: MediaBlob,
        category: Option<&str>,
        caption: Option<String>,
    ) -> AssetId {
        let category = category.unwrap_or(&self.config.gallery.default_category);
        collection.append(MediaAsset::pending(blob, category, caption))
    }

    /// Validates, crops, compresses and stages one gallery image
    ///
    /// # Errors
    ///
    /// Returns the first failing stage; the collection is unchanged.
    pub async fn ingest(
        &self,
        collection: &mut CollectionState,
        file: MediaFile,
        request: &CropRequest,
        category: Option<&str>,
        caption: Option<String>,
    ) -> MediaResult<AssetId> {
        let cropped = self.crop(file, self.config.crop.gallery_aspect, request)?;
        let prepared = self.prepare_gallery_image(&cropped).await?;
        Ok(self.stage(collection, prepared, category, caption))
    }

    /// Uploads every pending asset of `collection` into `folder`
    ///
    /// Uploads run as one sequential batch. Only when all of them succeed is
    /// the collection replaced by one whose pending assets became remote
    /// (same id, order, category and caption). On failure the collection is
    /// left exactly as it was and no new URL is referenced.
    ///
    /// Returns the number of assets uploaded.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::BatchUpload` naming the failed item and orphaned blobs.
    pub async fn upload_pending(
        &self,
        collection: &mut CollectionState,
        folder: &str,
    ) -> MediaResult<usize> {
        let pending: Vec<&MediaBlob> = collection
            .assets()
            .iter()
            .filter_map(|asset| match &asset.origin {
                AssetOrigin::Uploaded { blob } => Some(blob),
                AssetOrigin::Remote { .. } => None,
            })
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let urls = self.uploader.upload_batch(&pending, folder).await?;
        let uploaded = urls.len();

        let mut urls = urls.into_iter();
        let resolved: Vec<MediaAsset> = collection
            .assets()
            .iter()
            .cloned()
            .map(|asset| {
                if asset.origin.is_pending() {
                    if let Some(url) = urls.next() {
                        return asset.into_remote(url);
                    }
                }
                asset
            })
            .collect();
        collection.replace_all(resolved);

        tracing::info!(folder, uploaded, "Pending gallery assets uploaded");
        Ok(uploaded)
    }

    /// Uploads pending assets, then saves the gallery order under `key`
    ///
    /// # Errors
    ///
    /// Returns the upload failure (nothing saved) or the save failure
    /// (uploads kept, collection still dirty).
    pub async fn publish(
        &self,
        collection: &mut CollectionState,
        folder: &str,
        key: &str,
    ) -> MediaResult<usize> {
        self.upload_pending(collection, folder).await?;
        Ok(collection.save_order(self.galleries.as_ref(), key).await?)
    }

    /// Loads the gallery saved under `key`
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Store` if the document cannot be read.
    pub async fn load_gallery(&self, key: &str) -> MediaResult<CollectionState> {
        let records = self.galleries.load_gallery(key).await?;
        Ok(CollectionState::load(records))
    }

    /// Saves `collection` under `key` without uploading anything
    ///
    /// # Errors
    ///
    /// Returns `MediaError::OrderPersist`.
    pub async fn save_gallery(
        &self,
        collection: &mut CollectionState,
        key: &str,
    ) -> MediaResult<usize> {
        Ok(collection.save_order(self.galleries.as_ref(), key).await?)
    }

    /// Uploads a prepared logo and retires the one it replaces
    ///
    /// The previous blob is deleted best-effort after the new URL is known; a
    /// failed deletion is only logged.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Upload`; `current` is then still the live logo.
    pub async fn replace_logo(
        &self,
        current: Option<&LogoSlot>,
        prepared: &MediaBlob,
        folder: &str,
    ) -> MediaResult<LogoSlot> {
        let url = self.uploader.upload(prepared, folder).await?;
        if let Some(previous) = current {
            if previous.url != url {
                self.uploader.discard(&previous.url).await;
            }
        }
        Ok(LogoSlot { url })
    }

    /// Validates, crops, compresses and uploads a logo
    ///
    /// # Errors
    ///
    /// Returns the first failing stage.
    pub async fn upload_logo(
        &self,
        current: Option<&LogoSlot>,
        file: MediaFile,
        request: &CropRequest,
        folder: &str,
    ) -> MediaResult<LogoSlot> {
        let cropped = self.crop(file, self.config.crop.logo_aspect, request)?;
        let prepared = self.prepare_logo(&cropped).await?;
        self.replace_logo(current, &prepared, folder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::MemoryGalleryStore;
    use crate::error::MediaError;
    use crate::storage::{BlobPath, MemoryBlobStorage};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn pipeline() -> (MediaPipeline, Arc<MemoryBlobStorage>, Arc<MemoryGalleryStore>) {
        let storage = Arc::new(MemoryBlobStorage::new());
        let galleries = Arc::new(MemoryGalleryStore::new());
        let pipeline =
            MediaPipeline::new(MediaConfig::default(), storage.clone(), galleries.clone());
        (pipeline, storage, galleries)
    }

    #[test]
    fn test_crop_with_explicit_rect() {
        let (pipeline, _, _) = pipeline();
        let file = MediaFile::new("a.png", "image/png", png(320, 240));
        let request = CropRequest {
            rect: Some(CropRect::new(10, 10, 160, 90)),
            ..CropRequest::default()
        };

        let blob = pipeline.crop(file, AspectRatio::landscape(), &request).unwrap();

        let decoded = image::load_from_memory(&blob.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (160, 90));
    }

    #[test]
    fn test_explicit_rect_keeps_logo_square() {
        let (pipeline, _, _) = pipeline();
        let file = MediaFile::new("a.png", "image/png", png(320, 240));
        let request = CropRequest {
            rect: Some(CropRect::new(0, 0, 150, 40)),
            ..CropRequest::default()
        };

        let blob = pipeline.crop(file, AspectRatio::square(), &request).unwrap();

        let decoded = image::load_from_memory(&blob.data).unwrap();
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_invalid_file_never_opens_session() {
        let (pipeline, _, _) = pipeline();
        let file = MediaFile::new("a.gif", "image/gif", png(4, 4));
        let result = pipeline.start_crop(file, AspectRatio::square());
        assert!(matches!(result, Err(MediaError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ingest_stages_pending_asset() {
        let (pipeline, storage, _) = pipeline();
        let mut gallery = CollectionState::new();

        let id = pipeline
            .ingest(
                &mut gallery,
                MediaFile::new("shot.png", "image/png", png(640, 360)),
                &CropRequest::default(),
                None,
                Some("Dashboard".to_string()),
            )
            .await
            .unwrap();

        let asset = gallery.get(id).unwrap();
        assert!(asset.origin.is_pending());
        assert_eq!(asset.category, "web");
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_upload_pending_keeps_remote_and_order() {
        let (pipeline, storage, _) = pipeline();
        let mut gallery = CollectionState::new();
        gallery.append(MediaAsset::remote("https://cdn/existing.jpg", "web", None));
        let first_blob = MediaBlob::new("image/jpeg", vec![1]);
        let first = pipeline.stage(&mut gallery, first_blob, Some("mobile"), None);
        let second_blob = MediaBlob::new("image/jpeg", vec![2]);
        let second = pipeline.stage(&mut gallery, second_blob, None, None);

        let uploaded = pipeline.upload_pending(&mut gallery, "products/acme").await.unwrap();

        assert_eq!(uploaded, 2);
        assert_eq!(storage.len(), 2);
        assert_eq!(gallery.pending_count(), 0);
        assert_eq!(gallery.position(first), Some(1));
        assert_eq!(gallery.position(second), Some(2));
        assert_eq!(gallery.get(first).unwrap().category, "mobile");
        assert_eq!(gallery.assets()[0].origin.url(), Some("https://cdn/existing.jpg"));
        assert!(gallery.is_dirty());
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_collection_untouched() {
        let (pipeline, storage, _) = pipeline();
        storage.fail_puts_after(1);
        let mut gallery = CollectionState::new();
        pipeline.stage(&mut gallery, MediaBlob::new("image/jpeg", vec![1]), None, None);
        pipeline.stage(&mut gallery, MediaBlob::new("image/jpeg", vec![2]), None, None);
        let before = gallery.clone();

        let err = pipeline.upload_pending(&mut gallery, "gallery").await.unwrap_err();

        let MediaError::BatchUpload(batch) = err else {
            panic!("expected batch failure, got {err:?}");
        };
        assert_eq!(batch.failed_index, 1);
        assert_eq!(batch.orphaned.len(), 1);
        assert_eq!(gallery, before);
        assert!(gallery.assets().iter().all(|a| a.origin.url().is_none()));
    }

    #[tokio::test]
    async fn test_publish_and_reload() {
        let (pipeline, _, galleries) = pipeline();
        let mut gallery = CollectionState::new();
        pipeline.stage(&mut gallery, MediaBlob::new("image/jpeg", vec![1]), None, None);
        pipeline.stage(&mut gallery, MediaBlob::new("image/jpeg", vec![2]), None, None);

        let saved = pipeline.publish(&mut gallery, "portfolio", "portfolio/case-1").await.unwrap();

        assert_eq!(saved, 2);
        assert!(!gallery.is_dirty());
        assert_eq!(galleries.writes(), 1);

        let reloaded = pipeline.load_gallery("portfolio/case-1").await.unwrap();
        let urls: Vec<_> = reloaded.assets().iter().map(|a| a.origin.url()).collect();
        let expected: Vec<_> = gallery.assets().iter().map(|a| a.origin.url()).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_publish_save_failure_keeps_uploads() {
        let (pipeline, _, galleries) = pipeline();
        galleries.set_fail_saves(true);
        let mut gallery = CollectionState::new();
        pipeline.stage(&mut gallery, MediaBlob::new("image/jpeg", vec![1]), None, None);

        let err = pipeline.publish(&mut gallery, "g", "g/1").await.unwrap_err();

        assert!(matches!(err, MediaError::OrderPersist(_)));
        assert_eq!(gallery.pending_count(), 0);
        assert!(gallery.is_dirty());
    }

    #[tokio::test]
    async fn test_replace_logo_discards_previous() {
        let (pipeline, storage, _) = pipeline();
        let first = pipeline
            .replace_logo(None, &MediaBlob::new("image/jpeg", vec![1]), "logos")
            .await
            .unwrap();
        assert_eq!(storage.len(), 1);

        let second = pipeline
            .replace_logo(Some(&first), &MediaBlob::new("image/jpeg", vec![2]), "logos")
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_logo_survives_failed_cleanup() {
        let (pipeline, storage, _) = pipeline();
        let first = pipeline
            .replace_logo(None, &MediaBlob::new("image/jpeg", vec![1]), "logos")
            .await
            .unwrap();
        storage.fail_deletes();

        let second = pipeline
            .replace_logo(Some(&first), &MediaBlob::new("image/jpeg", vec![2]), "logos")
            .await;

        assert!(second.is_ok());
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_logo_is_square_and_small() {
        let (pipeline, storage, _) = pipeline();

        let slot = pipeline
            .upload_logo(
                None,
                MediaFile::new("logo.png", "image/png", png(1200, 900)),
                &CropRequest::default(),
                "logos",
            )
            .await
            .unwrap();

        let path = slot.url.trim_start_matches("memory://blobs/");
        let (content_type, stored) = storage.get(&BlobPath::parse(path).unwrap()).unwrap();
        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!(content_type, "image/jpeg");
        assert_eq!(decoded.width(), decoded.height());
        assert!(decoded.width() <= 800);
    }
}
