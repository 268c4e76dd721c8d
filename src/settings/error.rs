use std::path::PathBuf;
use thiserror::Error;

/// Settings load/save errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialise settings: {0}")]
    Serialise(#[source] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;
