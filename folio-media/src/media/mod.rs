//! Media values that flow through the pipeline
//!
//! - [`MediaFile`]: a candidate file exactly as the user selected it
//! - [`MediaBlob`]: bytes plus content type, produced by crop and compression
//! - [`MediaAsset`]: one entry of an ordered gallery, pending or persisted
//! - [`PersistedAsset`] / [`LogoSlot`]: the records stored on a parent document

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A file selected for upload, before validation
///
/// # Examples
///
/// ```rust
/// use folio_media::media::MediaFile;
///
/// let file = MediaFile::new("screenshot.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]);
/// assert_eq!(file.size(), 4);
/// assert_eq!(file.extension(), Some("png"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Original filename from the picker
    pub filename: String,

    /// Declared MIME content type
    pub content_type: String,

    /// File data
    pub data: Vec<u8>,
}

impl MediaFile {
    /// Creates a new candidate file
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Extension of the original filename, if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// Binary image payload handed between pipeline stages
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// MIME content type of `data`
    pub content_type: String,

    /// Encoded image bytes
    pub data: Vec<u8>,
}

impl MediaBlob {
    /// Creates a blob
    #[must_use]
    pub fn new(content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            data,
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// Raw bytes would flood logs
impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Per-session asset identifier, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Generates a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an asset's image currently lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Not yet uploaded; the asset owns the bytes
    Uploaded {
        /// Bytes awaiting upload
        blob: MediaBlob,
    },
    /// Already in blob storage
    Remote {
        /// Durable public URL
        url: String,
    },
}

impl AssetOrigin {
    /// The URL of a remote asset
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Remote { url } => Some(url),
            Self::Uploaded { .. } => None,
        }
    }

    /// Whether the asset still waits for upload
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// One image of an ordered gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Session identifier used for tracking and reorder
    pub id: AssetId,

    /// Pending bytes or persisted URL
    pub origin: AssetOrigin,

    /// Platform/context tag such as "web", "mobile" or "both"
    pub category: String,

    /// Dense zero-based rank, maintained by the owning collection
    pub display_order: usize,

    /// Optional caption
    pub caption: Option<String>,
}

impl MediaAsset {
    /// A freshly staged asset holding bytes that still need uploading
    #[must_use]
    pub fn pending(blob: MediaBlob, category: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            id: AssetId::new(),
            origin: AssetOrigin::Uploaded { blob },
            category: category.into(),
            display_order: 0,
            caption,
        }
    }

    /// An asset that already lives at `url`
    #[must_use]
    pub fn remote(
        url: impl Into<String>,
        category: impl Into<String>,
        caption: Option<String>,
    ) -> Self {
        Self {
            id: AssetId::new(),
            origin: AssetOrigin::Remote { url: url.into() },
            category: category.into(),
            display_order: 0,
            caption,
        }
    }

    /// Replaces pending bytes with the URL they were uploaded to
    ///
    /// Consumes the asset so the bytes are dropped; id, category, order and
    /// caption carry over.
    #[must_use]
    pub fn into_remote(self, url: impl Into<String>) -> Self {
        Self {
            origin: AssetOrigin::Remote { url: url.into() },
            ..self
        }
    }

    /// The persisted record, or `None` while the asset is pending
    #[must_use]
    pub fn to_record(&self) -> Option<PersistedAsset> {
        self.origin.url().map(|url| PersistedAsset {
            url: url.to_string(),
            category: self.category.clone(),
            display_order: self.display_order,
            caption: self.caption.clone(),
        })
    }
}

/// Gallery entry as stored on the parent record
///
/// ```json
/// { "url": "https://…/products/1718-ab12cd34.jpg", "category": "web", "displayOrder": 0 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAsset {
    /// Public URL of the image
    pub url: String,

    /// Platform/context tag
    #[serde(default)]
    pub category: String,

    /// Rank within the gallery
    pub display_order: usize,

    /// Optional caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Single-image slot (logo, cover) stored on the parent record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoSlot {
    /// Public URL of the image
    pub url: String,
}
