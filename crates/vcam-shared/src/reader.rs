use std::path::Path;
use std::sync::atomic::{fence, Ordering};

use crate::error::Result;
use crate::layout::{
    FrameFormat, FORMAT_OFFSET, HEIGHT_OFFSET, READY_OFFSET, STRIDE_OFFSET, WIDTH_OFFSET,
};
use crate::region::Region;

/// Attempts before giving up on a frame that keeps changing underneath us.
const READ_ATTEMPTS: usize = 8;

/// Metadata of a frame returned by [`SharedFrameReader::read_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: FrameFormat,
    /// Frame number assigned by the writer.
    pub sequence: u64,
}

/// Consumer side of an endpoint. Owns the region's lifetime and readiness.
pub struct SharedFrameReader {
    region: Region,
    last_sequence: u64,
}

impl SharedFrameReader {
    /// Create (or recreate) an endpoint with a frame slot of `capacity` bytes.
    pub fn create(path: impl AsRef<Path>, name: &str, capacity: usize) -> Result<Self> {
        Ok(Self {
            region: Region::create(path.as_ref(), name, capacity)?,
            last_sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        self.region.path()
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Advertise whether frames are currently being consumed.
    pub fn set_ready(&self, ready: bool) {
        self.region
            .field(READY_OFFSET)
            .store(u32::from(ready), Ordering::Release);
    }

    /// Copy the latest frame into `out` if one was published since the last
    /// successful read.
    pub fn read_frame(&mut self, out: &mut Vec<u8>) -> Option<FrameInfo> {
        let sequence = self.region.sequence();
        for _ in 0..READ_ATTEMPTS {
            let before = sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            if before == self.last_sequence {
                return None;
            }

            let width = self.region.field(WIDTH_OFFSET).load(Ordering::Relaxed);
            let height = self.region.field(HEIGHT_OFFSET).load(Ordering::Relaxed);
            let stride = self.region.field(STRIDE_OFFSET).load(Ordering::Relaxed);
            let format = self.region.field(FORMAT_OFFSET).load(Ordering::Relaxed);
            let len = (stride as usize)
                .saturating_mul(height as usize)
                .min(self.region.capacity());

            out.clear();
            out.resize(len, 0);
            // SAFETY: `len <= capacity`; the copy is discarded below unless
            // the counter is unchanged.
            unsafe { self.region.read_payload(out) };

            fence(Ordering::Acquire);
            if sequence.load(Ordering::Relaxed) != before {
                continue;
            }

            self.last_sequence = before;
            return FrameFormat::from_code(format).map(|format| FrameInfo {
                width,
                height,
                stride,
                format,
                sequence: before / 2,
            });
        }
        None
    }
}

impl Drop for SharedFrameReader {
    fn drop(&mut self) {
        self.set_ready(false);
    }
}
