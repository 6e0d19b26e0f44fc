//! Integration tests for gallery editing and publishing
//!
//! Drives the public API end to end against the in-memory blob backend and
//! the JSON gallery store.

use folio_media::prelude::*;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to encode a small gradient image
fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 251) as u8, (y % 241) as u8, 90]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Helper to build a pipeline over fresh backends
fn setup() -> (MediaPipeline, Arc<MemoryBlobStorage>, TempDir) {
    let temp = TempDir::new().unwrap();
    let storage = Arc::new(MemoryBlobStorage::with_base_url("https://cdn.example.com"));
    let galleries = Arc::new(JsonGalleryStore::new(temp.path()));
    let pipeline = MediaPipeline::new(MediaConfig::default(), storage.clone(), galleries);
    (pipeline, storage, temp)
}

fn urls(gallery: &CollectionState) -> Vec<String> {
    gallery
        .assets()
        .iter()
        .filter_map(|a| a.origin.url().map(str::to_string))
        .collect()
}

fn orders(gallery: &CollectionState) -> Vec<usize> {
    gallery.assets().iter().map(|a| a.display_order).collect()
}

#[tokio::test]
async fn test_reorder_save_and_reload() {
    let (pipeline, _, _temp) = setup();
    let key = "portfolio/rebrand/gallery";

    let mut gallery = CollectionState::new();
    for name in ["a", "b", "c"] {
        let url = format!("https://cdn.example.com/{name}.jpg");
        gallery.append(MediaAsset::remote(url, "web", None));
    }

    ReorderController::new()
        .apply(MoveGesture::Pointer { from: 0, drop_index: 2 }, &mut gallery)
        .unwrap();

    assert_eq!(
        urls(&gallery),
        [
            "https://cdn.example.com/b.jpg",
            "https://cdn.example.com/c.jpg",
            "https://cdn.example.com/a.jpg"
        ]
    );
    assert_eq!(orders(&gallery), [0, 1, 2]);
    assert!(gallery.is_dirty());

    pipeline.save_gallery(&mut gallery, key).await.unwrap();
    assert!(!gallery.is_dirty());

    let reloaded = pipeline.load_gallery(key).await.unwrap();
    assert_eq!(urls(&reloaded), urls(&gallery));
    assert_eq!(orders(&reloaded), [0, 1, 2]);
    assert!(!reloaded.is_dirty());
}

#[tokio::test]
async fn test_remove_second_of_four() {
    let mut gallery = CollectionState::new();
    let ids: Vec<AssetId> = (0..4)
        .map(|i| gallery.append(MediaAsset::remote(format!("s{i}"), "web", None)))
        .collect();

    gallery.remove(ids[1]).unwrap();

    assert_eq!(urls(&gallery), ["s0", "s2", "s3"]);
    assert_eq!(orders(&gallery), [0, 1, 2]);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_before_cropping() {
    let (pipeline, storage, _temp) = setup();
    let mut gallery = CollectionState::new();
    let file = MediaFile::new("huge.jpg", "image/jpeg", vec![0xFF; 6 * 1024 * 1024]);

    let err = pipeline
        .ingest(&mut gallery, file, &CropRequest::default(), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::Validation(ValidationError::TooLarge { .. })));
    assert!(err.is_user_error());
    assert!(gallery.is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_identical_names_get_distinct_urls() {
    let (pipeline, storage, _temp) = setup();
    let mut gallery = CollectionState::new();

    for _ in 0..3 {
        let bytes = image_bytes(320, 180, ImageFormat::Png);
        let file = MediaFile::new("screenshot.png", "image/png", bytes);
        pipeline
            .ingest(&mut gallery, file, &CropRequest::default(), Some("both"), None)
            .await
            .unwrap();
    }
    pipeline.upload_pending(&mut gallery, "products/acme").await.unwrap();

    let distinct: HashSet<String> = urls(&gallery).into_iter().collect();
    assert_eq!(distinct.len(), 3);
    assert_eq!(storage.len(), 3);
    assert!(distinct.iter().all(|u| u.starts_with("https://cdn.example.com/products/acme/")));
}

#[tokio::test]
async fn test_failed_second_upload_adds_nothing() {
    let (pipeline, storage, _temp) = setup();
    let key = "products/acme/screenshots";

    let mut gallery = CollectionState::new();
    gallery.append(MediaAsset::remote("https://cdn.example.com/existing.jpg", "web", None));
    pipeline.save_gallery(&mut gallery, key).await.unwrap();

    for _ in 0..2 {
        let bytes = image_bytes(256, 144, ImageFormat::Jpeg);
        let file = MediaFile::new("shot.jpg", "image/jpeg", bytes);
        pipeline
            .ingest(&mut gallery, file, &CropRequest::default(), None, None)
            .await
            .unwrap();
    }
    storage.fail_puts_after(1);

    let err = pipeline.publish(&mut gallery, "products/acme", key).await.unwrap_err();

    let MediaError::BatchUpload(batch) = err else {
        panic!("expected a batch failure, got {err:?}");
    };
    assert_eq!(batch.failed_index, 1);
    assert_eq!(batch.orphaned.len(), 1);

    assert_eq!(urls(&gallery), ["https://cdn.example.com/existing.jpg"]);
    assert_eq!(gallery.pending_count(), 2);

    let persisted = pipeline.load_gallery(key).await.unwrap();
    assert_eq!(urls(&persisted), ["https://cdn.example.com/existing.jpg"]);
}

#[tokio::test]
async fn test_crop_output_ignores_zoom() {
    let (pipeline, _, _temp) = setup();
    let rect = CropRect::new(40, 30, 200, 150);

    for zoom in [1.0, 2.0, 3.0] {
        let file = MediaFile::new("a.png", "image/png", image_bytes(400, 300, ImageFormat::Png));
        let mut session = pipeline.start_crop(file, AspectRatio::classic()).unwrap();
        session.set_zoom(zoom).unwrap();
        session.select(rect).unwrap();

        let blob = session.commit().unwrap();
        let decoded = image::load_from_memory(&blob.data).unwrap();

        assert_eq!((decoded.width(), decoded.height()), (200, 150), "zoom {zoom}");
        assert_eq!(session.phase(), CropPhase::Committed);
    }
}

#[tokio::test]
async fn test_logo_replacement_on_disk() {
    let uploads = TempDir::new().unwrap();
    let galleries = TempDir::new().unwrap();
    let mut config = MediaConfig::default();
    config.storage.root = uploads.path().to_path_buf();
    config.storage.public_base_url = "/uploads".to_string();
    config.gallery.store_root = galleries.path().to_path_buf();
    let pipeline = MediaPipeline::from_config(config).unwrap();

    let first = pipeline
        .upload_logo(
            None,
            MediaFile::new("logo.png", "image/png", image_bytes(300, 200, ImageFormat::Png)),
            &CropRequest::default(),
            "logos",
        )
        .await
        .unwrap();
    let second = pipeline
        .upload_logo(
            Some(&first),
            MediaFile::new("logo.png", "image/png", image_bytes(300, 200, ImageFormat::Png)),
            &CropRequest::default(),
            "logos",
        )
        .await
        .unwrap();

    assert_ne!(first.url, second.url);
    assert!(second.url.starts_with("/uploads/logos/"));

    let old_file = uploads.path().join(first.url.trim_start_matches("/uploads/"));
    let new_file = uploads.path().join(second.url.trim_start_matches("/uploads/"));
    assert!(!old_file.exists());
    assert!(new_file.exists());
}
