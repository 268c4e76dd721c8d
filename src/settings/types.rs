use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::device::types::TargetGeometry;
use crate::pipeline::Orientation;
use crate::settings::error::{Result, SettingsError};

/// Which transport frames are delivered through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Shared-memory endpoints created by consumer processes.
    #[default]
    Shared,
    /// V4L2 loopback nodes (Linux, `v4l2` feature).
    V4l2,
    /// In-memory transport that records frames.
    Dummy,
}

/// Pipeline configuration file. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub output_width: u32,
    pub output_height: u32,
    /// Absolute tolerance when comparing source and output aspect ratios.
    pub aspect_tolerance: f32,
    pub orientation: Orientation,
    pub transport: TransportKind,
    /// Directory holding shared-memory endpoints; platform default if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_root: Option<PathBuf>,
    /// Device bound at start-up; the first listed device if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,
    /// Frame rate of the feeder binary.
    pub fps: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_width: 1280,
            output_height: 720,
            aspect_tolerance: 0.1,
            orientation: Orientation::Normal,
            transport: TransportKind::Shared,
            shared_root: None,
            device_path: None,
            fps: 30,
        }
    }
}

/// Highest frame rate the feeder ticks at.
pub const MAX_FPS: u32 = 240;

impl PipelineSettings {
    pub fn geometry(&self) -> TargetGeometry {
        TargetGeometry::new(self.output_width, self.output_height)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "output geometry {}x{} must be non-zero",
                self.output_width, self.output_height
            )));
        }
        if !self.aspect_tolerance.is_finite() || self.aspect_tolerance < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "aspect tolerance {} must be a non-negative number",
                self.aspect_tolerance
            )));
        }
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(SettingsError::Invalid(format!(
                "fps {} must be between 1 and {MAX_FPS}",
                self.fps
            )));
        }
        Ok(())
    }
}
