use thiserror::Error;

/// Pipeline set-up errors. Per-frame failures are reported as
/// [`StatusCode`](super::StatusCode) values instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to allocate {bytes}-byte output buffer")]
    Allocation { bytes: usize },

    #[error("failed to spawn pipeline worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid output geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
