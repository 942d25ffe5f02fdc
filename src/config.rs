//! Viewer settings module.
//!
//! Handles loading and validating `framescope.toml`. Settings are optional:
//! a missing file yields the stock defaults, and a present file only needs
//! the keys it wants to override.
//!
//! ## Settings File Location
//!
//! Place `framescope.toml` next to the frames it describes:
//!
//! ```text
//! data/
//! ├── framescope.toml          # Optional, defaults apply when absent
//! ├── scan0001.edf
//! ├── scan0002.edf
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cache]
//! slots = 10                   # Shared pixel-buffer ring slots (>= 1)
//!
//! [scan]
//! extensions = ["edf", "tif", "tiff", "png", "jpg", "jpeg"]
//!
//! [sort]
//! key = "name"                 # Header key series ordering compares by
//! direction = "ascending"      # "ascending" or "descending"
//!
//! [preload]
//! max_workers = 4              # Max parallel decode workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::decode;
use crate::sort::SortSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name settings are read from, resolved against the series directory.
pub const SETTINGS_FILE: &str = "framescope.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Viewer settings loaded from `framescope.toml`.
///
/// All fields have sensible defaults. User files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Shared pixel-buffer cache settings.
    pub cache: CacheConfig,
    /// Which files a directory scan registers as frames.
    pub scan: ScanConfig,
    /// Initial series ordering, pushed onto every scanned record.
    pub sort: SortSpec,
    /// Parallel preloading settings.
    pub preload: PreloadConfig,
}

impl Settings {
    /// Validate settings values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.slots == 0 {
            return Err(ConfigError::Validation(
                "cache.slots must be at least 1".into(),
            ));
        }
        if self.scan.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "scan.extensions must not be empty".into(),
            ));
        }
        if self.sort.key.is_empty() {
            return Err(ConfigError::Validation("sort.key must not be empty".into()));
        }
        Ok(())
    }
}

/// Shared pixel-buffer cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Number of ring slots shared by every record of the series.
    pub slots: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            slots: crate::cache::DEFAULT_SLOTS,
        }
    }
}

/// Which files a directory scan registers as frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Extensions (without the dot) accepted as frame files.
    pub extensions: Vec<String>,
}

impl ScanConfig {
    /// Whether `path` carries one of the accepted extensions,
    /// case-insensitively.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: decode::supported_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Parallel preloading settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreloadConfig {
    /// Maximum number of parallel decode workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective preload worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &PreloadConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load settings from `framescope.toml` in the given directory.
///
/// Returns the stock defaults when the file does not exist; rejects unknown
/// keys and validates the result when it does.
pub fn load_settings(dir: &Path) -> Result<Settings, ConfigError> {
    let path = dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(&path)?;
    let settings: Settings = toml::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}
