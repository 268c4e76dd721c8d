use std::path::Path;
use std::sync::atomic::{fence, Ordering};

use crate::error::{Result, SharedError};
use crate::layout::{
    FrameFormat, FORMAT_OFFSET, HEIGHT_OFFSET, READY_OFFSET, STRIDE_OFFSET, WIDTH_OFFSET,
};
use crate::region::Region;

/// A finished frame handed to [`SharedFrameWriter::write_frame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    pub format: FrameFormat,
}

impl FrameRef<'_> {
    /// Number of payload bytes this frame occupies (`stride * height`).
    pub fn byte_len(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(SharedError::InvalidFrame(format!(
                "zero-sized frame {}x{}",
                self.width, self.height
            )));
        }
        let row = self.width as usize * self.format.bytes_per_pixel();
        if (self.stride as usize) < row {
            return Err(SharedError::InvalidFrame(format!(
                "stride {} shorter than row of {row} bytes",
                self.stride
            )));
        }
        let needed = self.stride as usize * self.height as usize;
        if self.pixels.len() < needed {
            return Err(SharedError::InvalidFrame(format!(
                "buffer holds {} bytes, frame needs {needed}",
                self.pixels.len()
            )));
        }
        Ok(needed)
    }
}

/// Producer side of an endpoint.
pub struct SharedFrameWriter {
    region: Region,
}

impl SharedFrameWriter {
    /// Open an endpoint created by a consumer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            region: Region::open(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        self.region.path()
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Frame slot size in bytes.
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Whether a consumer is currently reading this endpoint.
    pub fn is_receiver_ready(&self) -> bool {
        self.region.field(READY_OFFSET).load(Ordering::Acquire) != 0
    }

    /// Publish a frame. Returns the frame number (starting at 1).
    pub fn write_frame(&mut self, frame: &FrameRef<'_>) -> Result<u64> {
        let needed = frame.byte_len()?;
        if needed > self.region.capacity() {
            return Err(SharedError::FrameTooLarge {
                needed,
                capacity: self.region.capacity(),
            });
        }

        let sequence = self.region.sequence();
        let current = sequence.load(Ordering::Relaxed);
        // An odd value means a previous writer died mid-frame; reuse it.
        let writing = current | 1;
        sequence.store(writing, Ordering::Relaxed);
        fence(Ordering::Release);

        // SAFETY: the counter is odd and `needed <= capacity`.
        unsafe { self.region.write_payload(&frame.pixels[..needed]) };
        self.region.field(WIDTH_OFFSET).store(frame.width, Ordering::Relaxed);
        self.region.field(HEIGHT_OFFSET).store(frame.height, Ordering::Relaxed);
        self.region.field(STRIDE_OFFSET).store(frame.stride, Ordering::Relaxed);
        self.region
            .field(FORMAT_OFFSET)
            .store(frame.format.code(), Ordering::Relaxed);

        let published = writing.wrapping_add(1);
        sequence.store(published, Ordering::Release);
        Ok(published / 2)
    }
}
