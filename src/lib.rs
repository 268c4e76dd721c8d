//! Frame delivery pipeline for virtual camera devices.
//!
//! A producer hands BGRA frames to a [`FramePipeline`]; a single background
//! worker resizes them to the device's fixed output geometry, converts them
//! to RGB and submits them through the bound [`DeviceBackend`] transport.
//! Submission status changes are reported once per transition to a single
//! observer.

pub mod device;
pub mod diagnostics;
pub mod pipeline;
pub mod settings;

use std::sync::Arc;

pub use device::{DeviceBackend, DeviceError, DeviceInfo, DevicePath, TargetGeometry};
pub use pipeline::{
    FramePipeline, Orientation, PipelineError, PipelineOptions, StatusCode, StatusEvent,
    WorkerState,
};
pub use settings::{PipelineSettings, SettingsStore, TransportKind};

/// Create the transport backend selected by `settings`.
///
/// When `DUMMY_VCAM=1` is set, the in-memory dummy transport is used instead.
pub fn create_backend(settings: &PipelineSettings) -> Arc<dyn DeviceBackend> {
    if device::DummyBackend::is_enabled() {
        tracing::info!("DUMMY_VCAM set, using the dummy transport");
        return Arc::new(device::DummyBackend::new());
    }

    match settings.transport {
        TransportKind::Dummy => Arc::new(device::DummyBackend::new()),
        TransportKind::Shared => Arc::new(shared_backend(settings)),
        #[cfg(all(target_os = "linux", feature = "v4l2"))]
        TransportKind::V4l2 => Arc::new(device::V4l2LoopbackBackend::new()),
        #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
        TransportKind::V4l2 => {
            tracing::warn!("V4L2 transport not available in this build, using shared memory");
            Arc::new(shared_backend(settings))
        }
    }
}

fn shared_backend(settings: &PipelineSettings) -> device::SharedMemoryBackend {
    match &settings.shared_root {
        Some(root) => device::SharedMemoryBackend::new(root.clone()),
        None => device::SharedMemoryBackend::with_default_root(),
    }
}
