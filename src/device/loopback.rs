//! V4L2 loopback output (Linux, `v4l2` feature).
//!
//! Requires the `v4l2loopback` kernel module, e.g.
//! `modprobe v4l2loopback devices=1 video_nr=10 card_label="Virtual Camera"`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use v4l::prelude::*;
use v4l::video::Output;
use v4l::FourCC;

use crate::device::backend::{DeviceBackend, TransportHandle};
use crate::device::error::{DeviceError, Result};
use crate::device::types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
use crate::pipeline::StatusCode;

const LOOPBACK_DRIVER: &str = "v4l2 loopback";

/// Delivers frames by writing RGB24 images to `/dev/video*` loopback nodes.
pub struct V4l2LoopbackBackend {
    dev_root: PathBuf,
}

impl V4l2LoopbackBackend {
    pub fn new() -> Self {
        Self {
            dev_root: PathBuf::from("/dev"),
        }
    }
}

impl Default for V4l2LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Card label of `path` if it is an output-capable loopback node.
fn loopback_label(path: &Path) -> Option<String> {
    let device = Device::with_path(path).ok()?;
    let caps = device.query_caps().ok()?;
    let has_output = caps
        .capabilities
        .contains(v4l::capability::Flags::VIDEO_OUTPUT);
    (has_output && caps.driver.contains(LOOPBACK_DRIVER)).then_some(caps.card)
}

impl DeviceBackend for V4l2LoopbackBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let entries = std::fs::read_dir(&self.dev_root).map_err(|e| {
            DeviceError::Enumeration(format!("{}: {e}", self.dev_root.display()))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("video"))
            })
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .filter_map(|path| {
                let label = loopback_label(&path)?;
                Some(DeviceInfo {
                    friendly_name: label,
                    path: DevicePath::new(path.display().to_string()),
                })
            })
            .collect())
    }

    fn bind(
        &self,
        path: &DevicePath,
        geometry: TargetGeometry,
    ) -> Result<Box<dyn TransportHandle>> {
        let node = Path::new(path.as_str());
        if !node.exists() {
            return Err(DeviceError::DeviceNotFound(path.to_string()));
        }

        let device = Device::with_path(node).map_err(|e| DeviceError::Bind {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let requested = v4l::Format::new(geometry.width, geometry.height, FourCC::new(b"RGB3"));
        match device.set_format(&requested) {
            Ok(applied) => {
                if applied.width != geometry.width || applied.height != geometry.height {
                    return Err(DeviceError::UnsupportedGeometry {
                        path: path.to_string(),
                        width: geometry.width,
                        height: geometry.height,
                    });
                }
            }
            // Loopback nodes commonly accept writes without an explicit format.
            Err(e) => tracing::warn!("Could not set V4L2 format on {path} (may still work): {e}"),
        }

        let file = OpenOptions::new()
            .write(true)
            .open(node)
            .map_err(|e| DeviceError::Bind {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(LoopbackHandle {
            path: path.clone(),
            file,
            _device: device,
        }))
    }
}

struct LoopbackHandle {
    path: DevicePath,
    file: File,
    _device: Device,
}

impl TransportHandle for LoopbackHandle {
    fn path(&self) -> &DevicePath {
        &self.path
    }

    fn submit(&mut self, frame: &OutputFrame<'_>) -> StatusCode {
        let len = frame.stride as usize * frame.height as usize;
        let Some(pixels) = frame.pixels.get(..len) else {
            return StatusCode::SizeMismatch;
        };
        match self.file.write_all(pixels) {
            Ok(()) => StatusCode::Ok,
            Err(e) => {
                tracing::debug!("V4L2 write to {} failed: {e}", self.path);
                StatusCode::SubmitFailed
            }
        }
    }
}
