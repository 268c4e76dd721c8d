use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64};

use memmap2::{MmapOptions, MmapRaw};

use crate::error::{Result, SharedError};
use crate::layout::{RegionHeader, HEADER_SIZE, SEQUENCE_OFFSET};

/// A mapped endpoint file: header followed by one frame slot.
pub(crate) struct Region {
    path: PathBuf,
    name: String,
    capacity: usize,
    map: MmapRaw,
    _file: File,
}

impl Region {
    /// Create (or truncate) the region file and write a fresh header.
    pub(crate) fn create(path: &Path, name: &str, capacity: usize) -> Result<Self> {
        let capacity_u32 =
            u32::try_from(capacity).map_err(|_| SharedError::CapacityTooLarge(capacity))?;
        let header = RegionHeader::new(name, capacity_u32)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SharedError::io(parent))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(SharedError::io(path))?;
        file.set_len((HEADER_SIZE + capacity) as u64)
            .map_err(SharedError::io(path))?;
        file.write_all(bytemuck::bytes_of(&header))
            .map_err(SharedError::io(path))?;

        Self::map(file, path, &header)
    }

    /// Open an existing region, validating its header and length.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SharedError::NotFound(path.to_path_buf()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(SharedError::io(path))?;
        let header = read_header_from(&mut file, path)?;
        header.validate(path)?;

        let expected = HEADER_SIZE + header.capacity as usize;
        let actual = file.metadata().map_err(SharedError::io(path))?.len();
        if actual < expected as u64 {
            return Err(SharedError::InvalidRegion {
                path: path.to_path_buf(),
                reason: format!("file is {actual} bytes, header declares {expected}"),
            });
        }

        Self::map(file, path, &header)
    }

    fn map(file: File, path: &Path, header: &RegionHeader) -> Result<Self> {
        let capacity = header.capacity as usize;
        let map = MmapOptions::new()
            .len(HEADER_SIZE + capacity)
            .map_raw(&file)
            .map_err(SharedError::io(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            name: header.name(),
            capacity,
            map,
            _file: file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Atomic view of a 4-byte header field.
    pub(crate) fn field(&self, offset: usize) -> &AtomicU32 {
        debug_assert!(offset % 4 == 0 && offset + 4 <= HEADER_SIZE);
        // SAFETY: the mapping is page aligned and at least HEADER_SIZE bytes
        // long, `offset` is a 4-aligned header field, and the mapping lives as
        // long as `self`.
        unsafe { AtomicU32::from_ptr(self.map.as_mut_ptr().add(offset).cast::<u32>()) }
    }

    /// Atomic view of the seqlock counter.
    pub(crate) fn sequence(&self) -> &AtomicU64 {
        // SAFETY: SEQUENCE_OFFSET is 8-aligned inside the page-aligned header.
        unsafe { AtomicU64::from_ptr(self.map.as_mut_ptr().add(SEQUENCE_OFFSET).cast::<u64>()) }
    }

    /// Copy `src` into the frame slot.
    ///
    /// # Safety
    /// Caller must hold the odd seqlock state and `src.len() <= capacity`.
    pub(crate) unsafe fn write_payload(&self, src: &[u8]) {
        debug_assert!(src.len() <= self.capacity);
        let slot = self.map.as_mut_ptr().add(HEADER_SIZE);
        std::ptr::copy_nonoverlapping(src.as_ptr(), slot, src.len());
    }

    /// Copy the first `dst.len()` bytes of the frame slot into `dst`.
    ///
    /// # Safety
    /// `dst.len() <= capacity`; the result is only meaningful if the seqlock
    /// counter is unchanged afterwards.
    pub(crate) unsafe fn read_payload(&self, dst: &mut [u8]) {
        debug_assert!(dst.len() <= self.capacity);
        let slot = self.map.as_ptr().add(HEADER_SIZE);
        std::ptr::copy_nonoverlapping(slot, dst.as_mut_ptr(), dst.len());
    }
}

pub(crate) fn read_header_from(file: &mut File, path: &Path) -> Result<RegionHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    file.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SharedError::InvalidRegion {
                path: path.to_path_buf(),
                reason: "file shorter than region header".to_string(),
            }
        } else {
            SharedError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    Ok(bytemuck::pod_read_unaligned(&buf))
}
