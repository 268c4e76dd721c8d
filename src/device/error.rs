use thiserror::Error;
use vcam_shared::SharedError;

use crate::pipeline::StatusCode;

/// Device discovery and binding errors.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    #[error("failed to bind device {path}: {reason}")]
    Bind { path: String, reason: String },

    #[error("device {path} cannot carry {width}x{height} frames")]
    UnsupportedGeometry {
        path: String,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Shared(#[from] SharedError),
}

impl DeviceError {
    /// Status reported to the embedding layer for a failed bind.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) => StatusCode::NoActiveDevice,
            Self::Shared(SharedError::NotFound(_)) => StatusCode::NoActiveDevice,
            Self::UnsupportedGeometry { .. } => StatusCode::SizeMismatch,
            Self::Shared(SharedError::FrameTooLarge { .. }) => StatusCode::SizeMismatch,
            Self::Enumeration(_) | Self::Bind { .. } | Self::Shared(_) => {
                StatusCode::SubmitFailed
            }
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, DeviceError>;
