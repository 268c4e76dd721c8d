use serde::Serialize;
use std::fmt;

use crate::pipeline::convert::DST_BYTES_PER_PIXEL;

/// Opaque, stable identifier of a virtual-camera endpoint.
///
/// Returned by discovery and passed back unchanged to `bind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DevicePath(String);

impl DevicePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DevicePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A virtual-camera endpoint as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub friendly_name: String,
    pub path: DevicePath,
}

/// Fixed output resolution of a pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGeometry {
    pub width: u32,
    pub height: u32,
}

impl TargetGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Row length of the RGB output in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * DST_BYTES_PER_PIXEL
    }

    /// Size of the RGB output buffer in bytes.
    pub fn buffer_len(&self) -> usize {
        self.stride() * self.height as usize
    }
}

impl Default for TargetGeometry {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl fmt::Display for TargetGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A finished RGB frame handed to a transport.
#[derive(Debug, Clone, Copy)]
pub struct OutputFrame<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
}

impl<'a> OutputFrame<'a> {
    /// Tightly packed RGB frame.
    pub fn rgb(pixels: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
            stride: width * DST_BYTES_PER_PIXEL as u32,
        }
    }
}
