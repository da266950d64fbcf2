//! Service configuration.
//!
//! Loaded from an optional YAML file, then overridden by CLI flags and
//! environment variables. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog::CatalogSettings;
use field_common::DEFAULT_BUFFER_METERS;
use renderer::OverlayOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Upper bound on `catalog.max_retries`.
pub const MAX_CATALOG_RETRIES: u32 = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Catalog credential artifact.
    pub credentials_path: PathBuf,
    /// Buffer applied around field boundaries, in meters.
    pub buffer_meters: f64,
    pub catalog: CatalogSettings,
    pub download: DownloadSettings,
    pub overlay: OverlayOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("catalog-credentials.json"),
            buffer_meters: DEFAULT_BUFFER_METERS,
            catalog: CatalogSettings::default(),
            download: DownloadSettings::default(),
            overlay: OverlayOptions::default(),
        }
    }
}

/// File fetcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Bound on the whole transfer, connect to last byte.
    pub timeout_secs: u64,
    /// Where transient files are created; system temp dir when unset.
    pub transient_dir: Option<PathBuf>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            transient_dir: None,
        }
    }
}

impl DownloadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Values supplied on the command line or through the environment. `None`
/// leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub credentials_path: Option<PathBuf>,
    pub catalog_url: Option<String>,
    pub tiler_url: Option<String>,
    pub buffer_meters: Option<f64>,
    pub download_timeout_secs: Option<u64>,
    pub transient_dir: Option<PathBuf>,
}

impl AnalysisConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&text, &path.display().to_string())?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.credentials_path {
            self.credentials_path = path;
        }
        if let Some(url) = overrides.catalog_url {
            self.catalog.catalog_url = url;
        }
        if let Some(url) = overrides.tiler_url {
            self.catalog.tiler_url = url;
        }
        if let Some(meters) = overrides.buffer_meters {
            self.buffer_meters = meters;
        }
        if let Some(secs) = overrides.download_timeout_secs {
            self.download.timeout_secs = secs;
        }
        if let Some(dir) = overrides.transient_dir {
            self.download.transient_dir = Some(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.buffer_meters.is_finite() || self.buffer_meters < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "buffer_meters must be a non-negative number, got {}",
                self.buffer_meters
            )));
        }
        if self.download.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "download.timeout_secs must be positive".to_string(),
            ));
        }
        if self.overlay.max_dimension == 0 {
            return Err(ConfigError::Invalid(
                "overlay.max_dimension must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.catalog.max_cloud_cover) {
            return Err(ConfigError::Invalid(format!(
                "catalog.max_cloud_cover must be a percentage, got {}",
                self.catalog.max_cloud_cover
            )));
        }
        if self.catalog.max_retries > MAX_CATALOG_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "catalog.max_retries must be at most {MAX_CATALOG_RETRIES}, got {}",
                self.catalog.max_retries
            )));
        }
        Ok(())
    }
}
