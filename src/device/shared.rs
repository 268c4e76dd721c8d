use std::path::{Path, PathBuf};

use vcam_shared::{FrameFormat, FrameRef, SharedFrameWriter};

use crate::device::backend::{DeviceBackend, TransportHandle};
use crate::device::error::{DeviceError, Result};
use crate::device::types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
use crate::pipeline::StatusCode;

/// Delivers frames through shared-memory regions created by consumer
/// processes under a common root directory.
pub struct SharedMemoryBackend {
    root: PathBuf,
}

impl SharedMemoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Backend rooted at the platform default (`/dev/shm/vcam` on Linux).
    pub fn with_default_root() -> Self {
        Self::new(vcam_shared::default_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DeviceBackend for SharedMemoryBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let endpoints = vcam_shared::list_endpoints(&self.root)?;
        tracing::debug!(
            "Found {} shared-memory endpoint(s) under {}",
            endpoints.len(),
            self.root.display()
        );
        Ok(endpoints
            .into_iter()
            .map(|endpoint| DeviceInfo {
                friendly_name: endpoint.name,
                path: DevicePath::new(endpoint.path.display().to_string()),
            })
            .collect())
    }

    fn bind(
        &self,
        path: &DevicePath,
        geometry: TargetGeometry,
    ) -> Result<Box<dyn TransportHandle>> {
        let writer = SharedFrameWriter::open(path.as_str())?;
        if writer.capacity() < geometry.buffer_len() {
            return Err(DeviceError::UnsupportedGeometry {
                path: path.to_string(),
                width: geometry.width,
                height: geometry.height,
            });
        }
        tracing::debug!(
            "Opened shared-memory endpoint '{}' ({} byte slot)",
            writer.name(),
            writer.capacity()
        );
        Ok(Box::new(SharedHandle {
            path: path.clone(),
            writer,
        }))
    }
}

struct SharedHandle {
    path: DevicePath,
    writer: SharedFrameWriter,
}

impl TransportHandle for SharedHandle {
    fn path(&self) -> &DevicePath {
        &self.path
    }

    fn submit(&mut self, frame: &OutputFrame<'_>) -> StatusCode {
        if !self.writer.is_receiver_ready() {
            return StatusCode::TransportNotReady;
        }
        let frame = FrameRef {
            pixels: frame.pixels,
            width: frame.width,
            height: frame.height,
            stride: frame.stride,
            format: FrameFormat::Rgb24,
        };
        match self.writer.write_frame(&frame) {
            Ok(sequence) => {
                tracing::trace!("Published frame {sequence} to {}", self.path);
                StatusCode::Ok
            }
            Err(e) => {
                tracing::debug!("Shared-memory submit to {} failed: {e}", self.path);
                StatusCode::SubmitFailed
            }
        }
    }
}
