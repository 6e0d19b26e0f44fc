//! Image compression
//!
//! Re-encodes a cropped image so it fits a pixel and byte budget before
//! upload. Work runs on tokio's blocking pool; the input blob is only
//! borrowed, so a caller that hits a [`CompressionError`] still holds the
//! crop output and can retry with different options.
//!
//! # Examples
//!
//! ```rust,no_run
//! use folio_media::compress::{CompressionOptions, Compressor};
//! use folio_media::media::MediaBlob;
//!
//! # async fn example(cropped: MediaBlob) -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = Compressor::new();
//! let ready = compressor.compress(&cropped, &CompressionOptions::gallery()).await?;
//! assert!(ready.size() <= 1024 * 1024);
//! # Ok(())
//! # }
//! ```

use crate::media::MediaBlob;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// JPEG qualities tried in order before shrinking the image
const QUALITY_STEPS: [u8; 6] = [90, 80, 70, 60, 50, 40];

/// How many times the image may be shrunk to 80% while chasing the byte budget
const MAX_DOWNSCALE_ROUNDS: usize = 8;

const DOWNSCALE_FACTOR: f64 = 0.8;

/// Compression failures
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Input is not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Re-encoding failed
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Even the smallest attempt is over the byte budget
    #[error("Smallest encoding is {best} bytes, over the {limit} byte budget")]
    BudgetExceeded {
        /// Size of the smallest attempt
        best: u64,
        /// Configured budget
        limit: u64,
    },

    /// The blocking worker panicked or was cancelled
    #[error("Compression worker failed: {0}")]
    Worker(String),
}

/// Encoding used for compressed output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy baseline JPEG
    #[default]
    Jpeg,
    /// Lossless PNG
    Png,
    /// Lossless WebP
    Webp,
}

impl OutputFormat {
    /// MIME type of the encoding
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    const fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
        }
    }
}

/// Budget for one compression call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Maximum output size in bytes
    pub max_bytes: u64,

    /// Maximum length of the longest side in pixels
    pub max_dimension: u32,

    /// Output encoding
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl CompressionOptions {
    /// Gallery images: 1 MiB, 1920 px, JPEG
    #[must_use]
    pub const fn gallery() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_dimension: 1920,
            output_format: OutputFormat::Jpeg,
        }
    }

    /// Logos and thumbnails: 512 KiB, 800 px, JPEG
    #[must_use]
    pub const fn thumbnail() -> Self {
        Self {
            max_bytes: 512 * 1024,
            max_dimension: 800,
            output_format: OutputFormat::Jpeg,
        }
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self::gallery()
    }
}

/// Image compressor
#[derive(Debug, Clone)]
pub struct Compressor {
    /// Filter for resizing operations
    filter: FilterType,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    /// Creates a compressor using `FilterType::Lanczos3`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Creates a compressor with a specific resize filter
    #[must_use]
    pub const fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Compresses `blob` on the blocking pool
    ///
    /// # Errors
    ///
    /// See [`CompressionError`]. `blob` is untouched in every case.
    pub async fn compress(
        &self,
        blob: &MediaBlob,
        options: &CompressionOptions,
    ) -> Result<MediaBlob, CompressionError> {
        let data = blob.data.clone();
        let options = *options;
        let filter = self.filter;

        tokio::task::spawn_blocking(move || compress_bytes(&data, &options, filter))
            .await
            .map_err(|e| CompressionError::Worker(e.to_string()))?
    }

    /// Compresses `blob` on the current thread
    ///
    /// # Errors
    ///
    /// See [`CompressionError`].
    pub fn compress_blocking(
        &self,
        blob: &MediaBlob,
        options: &CompressionOptions,
    ) -> Result<MediaBlob, CompressionError> {
        compress_bytes(&blob.data, options, self.filter)
    }
}

fn compress_bytes(
    data: &[u8],
    options: &CompressionOptions,
    filter: FilterType,
) -> Result<MediaBlob, CompressionError> {
    let original = load_image(data)?;
    let (width, height) = original.dimensions();

    let max_dimension = options.max_dimension.max(1);
    let mut img = if width.max(height) > max_dimension {
        original.resize(max_dimension, max_dimension, filter)
    } else {
        original
    };

    let mut best: Option<usize> = None;
    for round in 0..=MAX_DOWNSCALE_ROUNDS {
        for encoded in encode_attempts(&img, options.output_format) {
            let encoded = encoded?;
            if encoded.len() as u64 <= options.max_bytes {
                tracing::debug!(
                    input_bytes = data.len(),
                    output_bytes = encoded.len(),
                    width = img.width(),
                    height = img.height(),
                    round,
                    "Image compressed"
                );
                return Ok(MediaBlob::new(options.output_format.mime_type(), encoded));
            }
            best = Some(best.map_or(encoded.len(), |b| b.min(encoded.len())));
        }

        let next_width = ((f64::from(img.width()) * DOWNSCALE_FACTOR) as u32).max(1);
        let next_height = ((f64::from(img.height()) * DOWNSCALE_FACTOR) as u32).max(1);
        if (next_width, next_height) == img.dimensions() {
            break;
        }
        img = img.resize_exact(next_width, next_height, filter);
    }

    let best = best.unwrap_or_default() as u64;
    tracing::warn!(best, limit = options.max_bytes, "Compression budget not reachable");
    Err(CompressionError::BudgetExceeded {
        best,
        limit: options.max_bytes,
    })
}

/// Encodings to try for one image size, cheapest first
fn encode_attempts(
    img: &DynamicImage,
    format: OutputFormat,
) -> Box<dyn Iterator<Item = Result<Vec<u8>, CompressionError>> + '_> {
    match format {
        OutputFormat::Jpeg => Box::new(QUALITY_STEPS.iter().map(move |q| encode_jpeg(img, *q))),
        OutputFormat::Png | OutputFormat::Webp => {
            Box::new(std::iter::once_with(move || encode_image(img, format.image_format())))
        }
    }
}

fn load_image(data: &[u8]) -> Result<DynamicImage, CompressionError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CompressionError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| CompressionError::Decode(e.to_string()))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&img.to_rgb8())
        .map_err(|e| CompressionError::Encode(e.to_string()))?;
    Ok(buffer)
}

fn encode_image(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, CompressionError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(img.to_rgba8())
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;
    Ok(buffer)
}
