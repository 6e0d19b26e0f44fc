//! Candidate file validation
//!
//! The first gate of the pipeline. A file must pass [`Validator::admit`]
//! before a crop session will accept it; a failure stops everything and is
//! handed back to the caller unchanged.
//!
//! # Examples
//!
//! ```rust
//! use folio_media::media::MediaFile;
//! use folio_media::validation::{ValidationError, Validator};
//!
//! let validator = Validator::default();
//!
//! let ok = MediaFile::new("cover.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
//! assert!(validator.validate(&ok).is_ok());
//!
//! let gif = MediaFile::new("anim.gif", "image/gif", vec![]);
//! assert!(matches!(
//!     validator.validate(&gif),
//!     Err(ValidationError::UnsupportedType { .. })
//! ));
//! ```

use crate::media::MediaFile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 5 MiB
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Reasons a candidate file is refused
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// File is larger than the configured limit
    #[error("File size {actual} exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual size in bytes
        actual: u64,
        /// Maximum allowed size
        limit: u64,
    },

    /// Declared type is not an accepted image type
    #[error("Unsupported file type {actual}; expected one of {allowed:?}")]
    UnsupportedType {
        /// Declared MIME type
        actual: String,
        /// Accepted MIME types
        allowed: Vec<String>,
    },

    /// File content does not look like an accepted image type
    #[error("File declared as {declared} but content is {detected}")]
    ContentMismatch {
        /// Declared MIME type
        declared: String,
        /// MIME type detected from magic bytes
        detected: String,
    },
}

/// Validation limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Maximum file size in bytes (inclusive)
    pub max_bytes: u64,

    /// Accepted MIME types
    pub allowed_mime_types: Vec<String>,

    /// Also require the magic bytes to identify an accepted type
    pub verify_content: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_mime_types: vec![
                mime::IMAGE_JPEG.to_string(),
                mime::IMAGE_PNG.to_string(),
                "image/webp".to_string(),
            ],
            verify_content: false,
        }
    }
}

/// A file that passed validation
///
/// Only [`Validator::admit`] produces this type, so holding one proves the
/// checks ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile(MediaFile);

impl ValidatedFile {
    /// Borrows the underlying file
    #[must_use]
    pub const fn file(&self) -> &MediaFile {
        &self.0
    }

    /// Returns the underlying file
    #[must_use]
    pub fn into_inner(self) -> MediaFile {
        self.0
    }
}

/// Enforces size and type constraints on candidate files
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
}

impl Validator {
    /// Creates a validator with explicit limits
    #[must_use]
    pub const fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// The active limits
    #[must_use]
    pub const fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Checks `file` against the limits without side effects
    ///
    /// Size is checked first, then the declared type, then (if enabled) the
    /// content.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self, file: &MediaFile) -> Result<(), ValidationError> {
        let size = file.size();
        if size > self.options.max_bytes {
            return Err(ValidationError::TooLarge {
                actual: size,
                limit: self.options.max_bytes,
            });
        }

        let declared = normalize_mime(&file.content_type);
        if !self.is_allowed(&declared) {
            return Err(ValidationError::UnsupportedType {
                actual: file.content_type.clone(),
                allowed: self.options.allowed_mime_types.clone(),
            });
        }

        if self.options.verify_content {
            let detected = infer::get(&file.data).map(|kind| kind.mime_type());
            match detected {
                Some(detected) if self.is_allowed(detected) => {}
                other => {
                    return Err(ValidationError::ContentMismatch {
                        declared: file.content_type.clone(),
                        detected: other.unwrap_or("unknown").to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Validates and wraps `file` for the crop stage
    ///
    /// # Errors
    ///
    /// Same as [`Validator::validate`].
    pub fn admit(&self, file: MediaFile) -> Result<ValidatedFile, ValidationError> {
        self.validate(&file).inspect_err(|e| {
            tracing::debug!(filename = %file.filename, error = %e, "File rejected");
        })?;
        Ok(ValidatedFile(file))
    }

    fn is_allowed(&self, mime_type: &str) -> bool {
        self.options
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

/// Drops parameters such as `; charset=binary` and lowercases the essence
fn normalize_mime(raw: &str) -> String {
    raw.parse::<mime::Mime>().map_or_else(
        |_| raw.trim().to_ascii_lowercase(),
        |parsed| parsed.essence_str().to_ascii_lowercase(),
    )
}
