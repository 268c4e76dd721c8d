// Frame delivery pipeline — queue, conversion, resizing, and status reporting.

pub mod convert;
pub mod error;
pub mod notifier;
pub mod pattern;
pub mod queue;
pub mod resize;
pub mod status;
pub mod worker;

pub use error::PipelineError;
pub use notifier::{StatusCallback, StatusNotifier};
pub use resize::{Orientation, ResizeStrategy};
pub use status::{StatusCode, StatusEvent};
pub use worker::{FramePipeline, PipelineOptions, WorkerState};
