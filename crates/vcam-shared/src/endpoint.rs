use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{Result, SharedError};
use crate::layout::{RegionHeader, ENDPOINT_EXTENSION};
use crate::region::read_header_from;

/// A discoverable endpoint region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Friendly name stored in the region header.
    pub name: String,
    pub path: PathBuf,
    /// Frame slot size in bytes.
    pub capacity: usize,
}

/// Directory that holds endpoint regions when none is configured.
///
/// `/dev/shm/vcam` on Linux (tmpfs-backed), the temp dir elsewhere.
pub fn default_root() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if cfg!(target_os = "linux") && shm.is_dir() {
        shm.join("vcam")
    } else {
        std::env::temp_dir().join("vcam")
    }
}

/// Path of the region file for `slot` under `root`.
pub fn endpoint_path(root: &Path, slot: &str) -> PathBuf {
    root.join(format!("{slot}.{ENDPOINT_EXTENSION}"))
}

/// Read and validate the header of a region file without mapping it.
pub fn read_header(path: &Path) -> Result<RegionHeader> {
    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SharedError::NotFound(path.to_path_buf())
        } else {
            SharedError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let header = read_header_from(&mut file, path)?;
    header.validate(path)?;
    Ok(header)
}

/// List every valid endpoint under `root`, sorted by path.
///
/// A missing root yields an empty list; files that are not valid regions
/// are skipped.
pub fn list_endpoints(root: &Path) -> Result<Vec<EndpointInfo>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(SharedError::Io {
                path: root.to_path_buf(),
                source: e,
            })
        }
    };

    let mut endpoints: Vec<EndpointInfo> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == ENDPOINT_EXTENSION))
        .filter_map(|path| {
            let header = read_header(&path).ok()?;
            Some(EndpointInfo {
                name: header.name(),
                capacity: header.capacity as usize,
                path,
            })
        })
        .collect();

    endpoints.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SharedFrameReader;
    use tempfile::TempDir;

    #[test]
    fn list_endpoints_returns_empty_for_missing_root() {
        let dir = TempDir::new().unwrap();
        let endpoints = list_endpoints(&dir.path().join("absent")).unwrap();
        assert!(endpoints.is_empty());
    }

    #[test]
    fn list_endpoints_finds_regions_sorted_by_path() {
        let dir = TempDir::new().unwrap();
        let _b = SharedFrameReader::create(endpoint_path(dir.path(), "b"), "Second", 8).unwrap();
        let _a = SharedFrameReader::create(endpoint_path(dir.path(), "a"), "First", 16).unwrap();

        let endpoints = list_endpoints(dir.path()).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].name, "First");
        assert_eq!(endpoints[0].capacity, 16);
        assert_eq!(endpoints[1].name, "Second");
    }

    #[test]
    fn list_endpoints_skips_foreign_and_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let _cam = SharedFrameReader::create(endpoint_path(dir.path(), "cam"), "Cam", 8).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("broken.vcam"), b"short").unwrap();

        let endpoints = list_endpoints(dir.path()).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].name, "Cam");
    }

    #[test]
    fn read_header_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_header(&dir.path().join("nope.vcam"));
        assert!(matches!(result, Err(SharedError::NotFound(_))));
    }

    #[test]
    fn endpoint_path_appends_extension() {
        let path = endpoint_path(Path::new("/tmp/vcam"), "slot1");
        assert_eq!(path, PathBuf::from("/tmp/vcam/slot1.vcam"));
    }
}
