use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::backend::{DeviceBackend, TransportHandle};
use crate::device::error::{DeviceError, Result};
use crate::device::types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
use crate::pipeline::StatusCode;

const DUMMY_DEVICE_NAME: &str = "Dummy Virtual Camera";

#[derive(Default)]
struct DummyState {
    ready: bool,
    failing: bool,
    frames_received: u64,
    last_frame: Option<Vec<u8>>,
    last_geometry: Option<(u32, u32, u32)>,
    active_bindings: usize,
    peak_bindings: usize,
}

/// An in-memory virtual camera for running without a real consumer.
///
/// Records every delivered frame and lets tests toggle readiness and inject
/// submission failures.
///
/// Enable via `DUMMY_VCAM=1` environment variable.
pub struct DummyBackend {
    devices: Vec<DeviceInfo>,
    state: Arc<Mutex<DummyState>>,
}

impl DummyBackend {
    /// A backend exposing a single ready device.
    pub fn new() -> Self {
        Self::with_devices(&[DUMMY_DEVICE_NAME])
    }

    /// A backend exposing one ready device per name, at `dummy://vcam-<index>`.
    pub fn with_devices(names: &[&str]) -> Self {
        let devices = names
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceInfo {
                friendly_name: (*name).to_string(),
                path: DevicePath::new(format!("dummy://vcam-{i}")),
            })
            .collect();
        Self {
            devices,
            state: Arc::new(Mutex::new(DummyState {
                ready: true,
                ..DummyState::default()
            })),
        }
    }

    /// Whether the dummy transport is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_VCAM").is_ok_and(|v| v == "1" || v == "true")
    }

    /// Path of the first device created by [`new`](Self::new).
    pub fn default_path() -> DevicePath {
        DevicePath::new("dummy://vcam-0")
    }

    /// Simulate a consumer attaching or detaching.
    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    /// Make every submission fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn frames_received(&self) -> u64 {
        self.state.lock().frames_received
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.state.lock().last_frame.clone()
    }

    /// Width, height and stride of the last delivered frame.
    pub fn last_geometry(&self) -> Option<(u32, u32, u32)> {
        self.state.lock().last_geometry
    }

    pub fn active_bindings(&self) -> usize {
        self.state.lock().active_bindings
    }

    /// Highest number of simultaneously live bindings seen.
    pub fn peak_bindings(&self) -> usize {
        self.state.lock().peak_bindings
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for DummyBackend {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn bind(
        &self,
        path: &DevicePath,
        _geometry: TargetGeometry,
    ) -> Result<Box<dyn TransportHandle>> {
        if !self.devices.iter().any(|d| &d.path == path) {
            return Err(DeviceError::DeviceNotFound(path.to_string()));
        }
        let mut state = self.state.lock();
        state.active_bindings += 1;
        state.peak_bindings = state.peak_bindings.max(state.active_bindings);
        Ok(Box::new(DummyHandle {
            path: path.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct DummyHandle {
    path: DevicePath,
    state: Arc<Mutex<DummyState>>,
}

impl TransportHandle for DummyHandle {
    fn path(&self) -> &DevicePath {
        &self.path
    }

    fn submit(&mut self, frame: &OutputFrame<'_>) -> StatusCode {
        let mut state = self.state.lock();
        if state.failing {
            return StatusCode::SubmitFailed;
        }
        if !state.ready {
            return StatusCode::TransportNotReady;
        }
        state.frames_received += 1;
        state.last_geometry = Some((frame.width, frame.height, frame.stride));
        match state.last_frame.as_mut() {
            Some(last) => {
                last.clear();
                last.extend_from_slice(frame.pixels);
            }
            None => state.last_frame = Some(frame.pixels.to_vec()),
        }
        StatusCode::Ok
    }
}

impl Drop for DummyHandle {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.active_bindings = state.active_bindings.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(backend: &DummyBackend) -> Box<dyn TransportHandle> {
        backend
            .bind(&DummyBackend::default_path(), TargetGeometry::new(2, 1))
            .unwrap()
    }

    #[test]
    fn lists_single_default_device() {
        let devices = DummyBackend::new().list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].friendly_name, DUMMY_DEVICE_NAME);
        assert_eq!(devices[0].path, DummyBackend::default_path());
    }

    #[test]
    fn records_delivered_frames() {
        let backend = DummyBackend::new();
        let mut handle = bind(&backend);
        let pixels = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(handle.submit(&OutputFrame::rgb(&pixels, 2, 1)), StatusCode::Ok);
        assert_eq!(backend.frames_received(), 1);
        assert_eq!(backend.last_frame().unwrap(), pixels.to_vec());
        assert_eq!(backend.last_geometry(), Some((2, 1, 6)));
    }

    #[test]
    fn not_ready_reports_transport_not_ready() {
        let backend = DummyBackend::new();
        let mut handle = bind(&backend);
        backend.set_ready(false);
        let pixels = [0u8; 6];
        assert_eq!(
            handle.submit(&OutputFrame::rgb(&pixels, 2, 1)),
            StatusCode::TransportNotReady
        );
        assert_eq!(backend.frames_received(), 0);
    }

    #[test]
    fn failure_injection_reports_submit_failed() {
        let backend = DummyBackend::new();
        let mut handle = bind(&backend);
        backend.set_failing(true);
        let pixels = [0u8; 6];
        assert_eq!(
            handle.submit(&OutputFrame::rgb(&pixels, 2, 1)),
            StatusCode::SubmitFailed
        );
        backend.set_failing(false);
        assert_eq!(handle.submit(&OutputFrame::rgb(&pixels, 2, 1)), StatusCode::Ok);
    }

    #[test]
    fn dropping_handle_releases_binding() {
        let backend = DummyBackend::new();
        let handle = bind(&backend);
        assert_eq!(backend.active_bindings(), 1);
        drop(handle);
        assert_eq!(backend.active_bindings(), 0);
        assert_eq!(backend.peak_bindings(), 1);
    }

    #[test]
    fn unknown_path_is_not_found() {
        let backend = DummyBackend::with_devices(&["A", "B"]);
        assert!(backend
            .bind(&DevicePath::new("dummy://vcam-1"), TargetGeometry::default())
            .is_ok());
        assert!(matches!(
            backend.bind(&DevicePath::new("dummy://vcam-2"), TargetGeometry::default()),
            Err(DeviceError::DeviceNotFound(_))
        ));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn dummy_backend_is_send_and_sync() {
        assert_send_sync::<DummyBackend>();
    }
}
