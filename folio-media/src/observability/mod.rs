//! Structured logging
//!
//! Every pipeline stage logs through `tracing` with structured fields. This
//! module installs the subscriber that renders them.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per event
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Output format
    pub format: LogFormat,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "folio-media".to_string(),
            format: LogFormat::default(),
            default_filter: if cfg!(debug_assertions) {
                "debug,folio_media=trace".to_string()
            } else {
                "info".to_string()
            },
        }
    }
}

impl ObservabilityConfig {
    /// Create new observability config
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Use a specific output format
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Use a specific fallback filter, e.g. `"warn,folio_media=info"`
    #[must_use]
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Initialize logging with the default configuration
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use folio_media::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Pipeline ready");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    init_with(&ObservabilityConfig::default())
}

/// Initialize logging
///
/// `RUST_LOG` overrides `config.default_filter` when set.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_with(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).try_init()?,
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
    }

    tracing::debug!(service = %config.service_name, format = ?config.format, "Logging initialized");
    Ok(())
}
