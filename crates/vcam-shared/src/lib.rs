//! Shared memory IPC for virtual camera frame transport.
//!
//! A virtual camera consumer (the process that exposes the camera to other
//! applications) creates one region per endpoint with [`SharedFrameReader`].
//! The producer opens the same file with [`SharedFrameWriter`] and publishes
//! finished frames into it. The region starts with a fixed [`RegionHeader`]
//! followed by a single frame slot; a sequence counter in the header acts as
//! a seqlock so readers never observe a half-written frame.

mod endpoint;
mod error;
mod layout;
mod reader;
mod region;
mod writer;

pub use endpoint::{default_root, endpoint_path, list_endpoints, read_header, EndpointInfo};
pub use error::{Result, SharedError};
pub use layout::{
    FrameFormat, RegionHeader, ENDPOINT_EXTENSION, HEADER_SIZE, NAME_LEN, REGION_MAGIC,
    REGION_VERSION,
};
pub use reader::{FrameInfo, SharedFrameReader};
pub use writer::{FrameRef, SharedFrameWriter};
