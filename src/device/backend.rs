use crate::device::error::Result;
use crate::device::types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
use crate::pipeline::StatusCode;

/// Virtual-camera transport.
///
/// One implementation per delivery channel (shared memory, V4L2 loopback,
/// in-memory dummy). Provides endpoint discovery and binding; a binding is
/// the only thing frames are submitted through.
pub trait DeviceBackend: Send + Sync {
    /// Enumerate the endpoints frames can currently be delivered to.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Acquire a handle for `path`, configured for `geometry` RGB frames.
    fn bind(&self, path: &DevicePath, geometry: TargetGeometry)
        -> Result<Box<dyn TransportHandle>>;
}

/// A live binding to one endpoint. Dropping it releases the endpoint.
pub trait TransportHandle: Send {
    fn path(&self) -> &DevicePath;

    /// Deliver one finished frame. Never blocks on the consumer.
    fn submit(&mut self, frame: &OutputFrame<'_>) -> StatusCode;
}
