//! Tunable constants and the on-disk configuration file.
//!
//! The config file is optional. Every key has a default, so an empty or
//! partial file is valid:
//!
//! ```toml
//! theme = "dark"
//!
//! [cache]
//! max_loaded_diffs = 20
//! eviction_interval_ms = 2000
//!
//! [loader]
//! batch_size = 3
//! max_file_bytes = 2097152
//!
//! [visibility]
//! margin_rows = 25
//! debounce_ms = 100
//!
//! [diff]
//! context_lines = 3
//! min_collapse = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration as read from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    pub cache: CacheConfig,
    pub loader: LoaderConfig,
    pub visibility: VisibilityConfig,
    pub diff: DiffConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            cache: CacheConfig::default(),
            loader: LoaderConfig::default(),
            visibility: VisibilityConfig::default(),
            diff: DiffConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache size above which the eviction pass starts reclaiming entries.
    pub max_loaded_diffs: usize,
    pub eviction_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_loaded_diffs: 20, eviction_interval_ms: 2000 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum files fetched per batch.
    pub batch_size: usize,
    /// Files larger than this load as a `TooLarge` error.
    pub max_file_bytes: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 3, max_file_bytes: 2 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Prefetch margin above and below the viewport, in rows.
    /// 25 rows is roughly 500px at a 20px row height.
    pub margin_rows: usize,
    pub debounce_ms: u64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self { margin_rows: 25, debounce_ms: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    /// Unchanged lines kept visible around each change.
    pub context_lines: usize,
    /// Shortest run of hidden lines worth folding.
    pub min_collapse: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { context_lines: 3, min_collapse: 4 }
    }
}

/// The subset of [`Config`] the session pipeline consults at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    pub max_loaded_diffs: usize,
    pub visibility_margin_rows: usize,
    pub debounce: Duration,
    pub eviction_interval: Duration,
    pub batch_size: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Config::default().tunables()
    }
}

impl Config {
    /// Parses a config document. Unknown keys are ignored.
    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reads `path`, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path: path.display().to_string(), source }),
        }
    }

    /// Like [`Config::load`] but never fails: problems are logged and the
    /// defaults are used instead.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("config: {e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn tunables(&self) -> Tunables {
        Tunables {
            max_loaded_diffs: self.cache.max_loaded_diffs,
            visibility_margin_rows: self.visibility.margin_rows,
            debounce: Duration::from_millis(self.visibility.debounce_ms),
            eviction_interval: Duration::from_millis(self.cache.eviction_interval_ms),
            batch_size: self.loader.batch_size.max(1),
        }
    }
}

/// Returns the path to the scrollrev config file.
///
/// Prefers `$XDG_CONFIG_HOME/scrollrev/config.toml`; falls back to
/// `~/.config/scrollrev/config.toml` when the variable is absent.
pub fn default_config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("scrollrev").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("", Path::new("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        let t = config.tunables();
        assert_eq!(t.max_loaded_diffs, 20);
        assert_eq!(t.batch_size, 3);
        assert_eq!(t.debounce, Duration::from_millis(100));
        assert_eq!(t.eviction_interval, Duration::from_millis(2000));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = "theme = \"dark\"\n[cache]\nmax_loaded_diffs = 5\n[loader]\nbatch_size = 0\n";
        let config = Config::from_toml(raw, Path::new("config.toml")).unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.cache.max_loaded_diffs, 5);
        assert_eq!(config.cache.eviction_interval_ms, 2000);
        // A zero batch would stall the loader.
        assert_eq!(config.tunables().batch_size, 1);
    }

    #[test]
    fn malformed_document_reports_the_path() {
        let err = Config::from_toml("[cache\n", Path::new("/tmp/x.toml")).unwrap_err();
        assert!(err.to_string().contains("/tmp/x.toml"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
