use std::mem::{offset_of, size_of};
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::error::{Result, SharedError};

/// `VCAM` in little-endian byte order.
pub const REGION_MAGIC: u32 = u32::from_le_bytes(*b"VCAM");
pub const REGION_VERSION: u32 = 1;
/// Maximum endpoint name length in bytes (UTF-8, NUL padded).
pub const NAME_LEN: usize = 64;
/// File extension of endpoint regions inside the shared root.
pub const ENDPOINT_EXTENSION: &str = "vcam";

/// Fixed header at offset 0 of every region.
///
/// `receiver_ready` and `sequence` are written concurrently by the two sides
/// and are only ever accessed atomically once the region is mapped.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RegionHeader {
    pub magic: u32,
    pub version: u32,
    /// Size of the frame slot in bytes.
    pub capacity: u32,
    /// Non-zero while a consumer application is reading frames.
    pub receiver_ready: u32,
    pub width: u32,
    pub height: u32,
    /// Bytes per row of the published frame.
    pub stride: u32,
    /// [`FrameFormat`] code of the published frame.
    pub format: u32,
    /// Seqlock counter: odd while a frame is being written.
    pub sequence: u64,
    pub name: [u8; NAME_LEN],
}

pub const HEADER_SIZE: usize = size_of::<RegionHeader>();

pub(crate) const READY_OFFSET: usize = offset_of!(RegionHeader, receiver_ready);
pub(crate) const WIDTH_OFFSET: usize = offset_of!(RegionHeader, width);
pub(crate) const HEIGHT_OFFSET: usize = offset_of!(RegionHeader, height);
pub(crate) const STRIDE_OFFSET: usize = offset_of!(RegionHeader, stride);
pub(crate) const FORMAT_OFFSET: usize = offset_of!(RegionHeader, format);
pub(crate) const SEQUENCE_OFFSET: usize = offset_of!(RegionHeader, sequence);

impl RegionHeader {
    /// Build a fresh header for a region with the given name and slot size.
    pub fn new(name: &str, capacity: u32) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > NAME_LEN {
            return Err(SharedError::InvalidName(bytes.len()));
        }
        let mut header = Self::zeroed();
        header.magic = REGION_MAGIC;
        header.version = REGION_VERSION;
        header.capacity = capacity;
        header.name[..bytes.len()].copy_from_slice(bytes);
        Ok(header)
    }

    /// Check magic and version.
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.magic != REGION_MAGIC {
            return Err(SharedError::InvalidRegion {
                path: path.to_path_buf(),
                reason: format!("bad magic {:#010x}", self.magic),
            });
        }
        if self.version != REGION_VERSION {
            return Err(SharedError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Endpoint name up to the first NUL byte.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

/// Pixel layout of a published frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FrameFormat {
    /// 3 bytes per pixel, R G B.
    Rgb24 = 1,
    /// 4 bytes per pixel, B G R A.
    Bgra32 = 2,
}

impl FrameFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Bgra32 => 4,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Rgb24),
            2 => Some(Self::Bgra32),
            _ => None,
        }
    }
}
