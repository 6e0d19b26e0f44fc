//! Configuration management
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `FOLIO_` prefix, `__` for nesting)
//! 2. `./config.toml` (development)
//! 3. `~/.config/folio-media/{service}/config.toml` (user config, XDG)
//! 4. `/etc/folio-media/{service}/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! Environment variable format: `FOLIO_SECTION__FIELD_NAME`, for example
//! `FOLIO_VALIDATION__MAX_BYTES=2097152` or
//! `FOLIO_COMPRESSION__GALLERY__OUTPUT_FORMAT=webp`.
//!
//! # Example Configuration
//!
//! ```toml
//! [validation]
//! max_bytes = 5242880
//! allowed_mime_types = ["image/jpeg", "image/png", "image/webp"]
//! verify_content = true
//!
//! [crop]
//! output_quality = 92
//! gallery_aspect = "16:9"
//! logo_aspect = "1:1"
//!
//! [compression.gallery]
//! max_bytes = 1048576
//! max_dimension = 1920
//! output_format = "jpeg"
//!
//! [storage]
//! root = "./public/uploads"
//! public_base_url = "/uploads"
//!
//! [gallery]
//! store_root = "./data/galleries"
//! default_category = "web"
//! ```

use crate::compress::CompressionOptions;
use crate::crop::{AspectRatio, DEFAULT_OUTPUT_QUALITY};
use crate::validation::ValidationOptions;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used under `/etc` and the user config dir
const CONFIG_DIR_NAME: &str = "folio-media";

/// Environment variable prefix
const ENV_PREFIX: &str = "FOLIO_";

/// Crop session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    /// JPEG quality of committed crops (1-100)
    pub output_quality: u8,

    /// Aspect ratio for gallery images
    pub gallery_aspect: AspectRatio,

    /// Aspect ratio for logo slots
    pub logo_aspect: AspectRatio,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            output_quality: DEFAULT_OUTPUT_QUALITY,
            gallery_aspect: AspectRatio::landscape(),
            logo_aspect: AspectRatio::square(),
        }
    }
}

/// Compression presets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Budget for gallery images
    pub gallery: CompressionOptions,

    /// Budget for logos and thumbnails
    pub thumbnail: CompressionOptions,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            gallery: CompressionOptions::gallery(),
            thumbnail: CompressionOptions::thumbnail(),
        }
    }
}

/// Blob storage settings for the filesystem backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory blobs are written to
    pub root: PathBuf,

    /// URL prefix the directory is served under
    pub public_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./uploads"),
            public_base_url: "/uploads".to_string(),
        }
    }
}

/// Gallery document settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySettings {
    /// Directory the JSON gallery store writes to
    pub store_root: PathBuf,

    /// Category given to new assets when none is specified
    pub default_category: String,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./galleries"),
            default_category: "web".to_string(),
        }
    }
}

/// Complete media pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Upload validation limits
    pub validation: ValidationOptions,

    /// Crop settings
    pub crop: CropSettings,

    /// Compression presets
    pub compression: CompressionSettings,

    /// Blob storage
    pub storage: StorageSettings,

    /// Gallery documents
    pub gallery: GallerySettings,
}

impl MediaConfig {
    /// Load configuration for a specific service
    ///
    /// Searches the locations listed in the module docs, lowest priority first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file cannot be read or parsed
    /// - Configuration values fail type conversion
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use folio_media::config::MediaConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = MediaConfig::load_for_service("admin")?;
    /// println!("gallery budget: {} bytes", config.compression.gallery.max_bytes);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_for_service(service_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        let system_config = PathBuf::from("/etc")
            .join(CONFIG_DIR_NAME)
            .join(service_name)
            .join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        let user_config = Self::recommended_path(service_name);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file, then apply environment overrides
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or values of the
    /// wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// XDG config path for a service: `~/.config/folio-media/{service}/config.toml`
    #[must_use]
    pub fn recommended_path(service_name: &str) -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| {
                config_dir
                    .join(CONFIG_DIR_NAME)
                    .join(service_name)
                    .join("config.toml")
            },
        )
    }
}
