use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared-memory transport errors.
#[derive(Debug, Error)]
pub enum SharedError {
    #[error("endpoint not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid region in {}: {reason}", .path.display())]
    InvalidRegion { path: PathBuf, reason: String },

    #[error("unsupported region version {0}")]
    UnsupportedVersion(u32),

    #[error("endpoint name must be 1 to 64 bytes, got {0}")]
    InvalidName(usize),

    #[error("region capacity of {0} bytes is too large")]
    CapacityTooLarge(usize),

    #[error("frame of {needed} bytes exceeds region capacity of {capacity} bytes")]
    FrameTooLarge { needed: usize, capacity: usize },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl SharedError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SharedError>;
