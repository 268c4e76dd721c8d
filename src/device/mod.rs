// Device domain — endpoint discovery, transports, and the bound session.

pub mod backend;
pub mod dummy;
pub mod error;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub mod loopback;
pub mod session;
pub mod shared;
pub mod types;

pub use backend::{DeviceBackend, TransportHandle};
pub use dummy::DummyBackend;
pub use error::DeviceError;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub use loopback::V4l2LoopbackBackend;
pub use session::DeviceSession;
pub use shared::SharedMemoryBackend;
pub use types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
