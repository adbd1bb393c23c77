//! Error types for the content pipeline.
//!
//! Selection never fails, so there is no selection error here: out-of-range
//! input degrades to "nothing selected".

use thiserror::Error;

/// A per-file diff load that did not produce content.
///
/// Cloneable so a failure can be both logged and kept as the selected file's
/// visible error state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The backend itself failed (repository I/O, bad ref, worker gone).
    #[error("backend error: {0}")]
    Backend(String),
    /// The file exists in the change set but cannot be shown as a diff.
    #[error("{path}: unsupported content ({reason})")]
    Unsupported { path: String, reason: String },
    #[error("{path}: {bytes} bytes exceeds the {limit} byte limit")]
    TooLarge { path: String, bytes: u64, limit: u64 },
    /// The path is no longer part of the change set.
    #[error("{0}: not in the current change set")]
    Missing(String),
}

/// Failure to read or parse the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
