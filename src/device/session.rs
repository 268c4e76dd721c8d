use std::sync::Arc;

use crate::device::backend::{DeviceBackend, TransportHandle};
use crate::device::error::Result;
use crate::device::types::{DeviceInfo, DevicePath, OutputFrame, TargetGeometry};
use crate::pipeline::StatusCode;

/// Owns the zero-or-one live binding to a virtual-camera endpoint.
pub struct DeviceSession {
    backend: Arc<dyn DeviceBackend>,
    geometry: TargetGeometry,
    handle: Option<Box<dyn TransportHandle>>,
}

impl DeviceSession {
    pub fn new(backend: Arc<dyn DeviceBackend>, geometry: TargetGeometry) -> Self {
        Self {
            backend,
            geometry,
            handle: None,
        }
    }

    pub fn geometry(&self) -> TargetGeometry {
        self.geometry
    }

    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.backend.list_devices()
    }

    /// Bind `path`, releasing any previous binding first.
    ///
    /// On failure the session is left unbound.
    pub fn bind(&mut self, path: &DevicePath) -> Result<()> {
        self.unbind();
        let handle = self.backend.bind(path, self.geometry)?;
        tracing::info!("Bound virtual camera {path} at {}", self.geometry);
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the binding. No-op when unbound.
    pub fn unbind(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::info!("Unbound virtual camera {}", handle.path());
        }
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    pub fn bound_path(&self) -> Option<&DevicePath> {
        self.handle.as_ref().map(|h| h.path())
    }

    /// Forward a finished RGB frame to the bound endpoint.
    ///
    /// Frames that do not match the configured geometry are rejected before
    /// the transport is touched.
    pub fn submit(&mut self, buffer: &[u8], width: u32, height: u32) -> StatusCode {
        if width != self.geometry.width
            || height != self.geometry.height
            || buffer.len() != self.geometry.buffer_len()
        {
            return StatusCode::SizeMismatch;
        }
        match self.handle.as_mut() {
            Some(handle) => handle.submit(&OutputFrame::rgb(buffer, width, height)),
            None => StatusCode::NoActiveDevice,
        }
    }
}
