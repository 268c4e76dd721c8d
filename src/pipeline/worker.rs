use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::device::backend::DeviceBackend;
use crate::device::error::DeviceError;
use crate::device::session::DeviceSession;
use crate::device::types::{DeviceInfo, DevicePath, TargetGeometry};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::settings::types::PipelineSettings;

use super::error::{PipelineError, Result};
use super::notifier::{StatusCallback, StatusNotifier};
use super::queue::{Dequeued, FrameQueue, FrameTask};
use super::resize::{FrameResizer, Orientation};
use super::status::{StatusCode, StatusEvent};

/// Lifecycle of the background worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    /// Stop requested; the in-flight frame is being finished.
    Stopping,
}

/// Fixed parameters of a pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub geometry: TargetGeometry,
    pub aspect_tolerance: f32,
    pub orientation: Orientation,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            geometry: TargetGeometry::default(),
            aspect_tolerance: 0.1,
            orientation: Orientation::Normal,
        }
    }
}

impl From<&PipelineSettings> for PipelineOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            geometry: settings.geometry(),
            aspect_tolerance: settings.aspect_tolerance,
            orientation: settings.orientation,
        }
    }
}

/// Allocate the worker's RGB output buffer, reporting failure instead of
/// aborting the process.
fn allocate_output(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| PipelineError::Allocation { bytes: len })?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Frame delivery pipeline: a queue drained by one background worker that
/// resizes, converts and submits each frame to the bound virtual camera.
///
/// All methods take `&self`; the pipeline can be shared behind an `Arc`
/// between the producer and the embedding layer.
pub struct FramePipeline {
    options: PipelineOptions,
    queue: Arc<FrameQueue>,
    session: Arc<Mutex<DeviceSession>>,
    notifier: Arc<StatusNotifier>,
    stats: Arc<Mutex<DiagnosticStats>>,
    state: Mutex<WorkerState>,
    /// Serialises `start`/`stop`; holds the worker while it runs.
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl FramePipeline {
    pub fn new(backend: Arc<dyn DeviceBackend>, options: PipelineOptions) -> Self {
        Self {
            options,
            queue: Arc::new(FrameQueue::new()),
            session: Arc::new(Mutex::new(DeviceSession::new(backend, options.geometry))),
            notifier: Arc::new(StatusNotifier::new()),
            stats: Arc::new(Mutex::new(DiagnosticStats::new())),
            state: Mutex::new(WorkerState::Idle),
            thread: Mutex::new(None),
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Spawn the worker. No-op if it is already running.
    ///
    /// Fails on a zero-sized output geometry, or if the output buffer cannot
    /// be allocated or the thread cannot be spawned; the pipeline stays idle
    /// in that case.
    pub fn start(&self) -> Result<()> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }

        let geometry = self.options.geometry;
        if geometry.width == 0 || geometry.height == 0 {
            return Err(PipelineError::InvalidGeometry {
                width: geometry.width,
                height: geometry.height,
            });
        }
        let output = allocate_output(self.options.geometry.buffer_len())?;
        let mut worker = Worker {
            geometry: self.options.geometry,
            queue: Arc::clone(&self.queue),
            session: Arc::clone(&self.session),
            notifier: Arc::clone(&self.notifier),
            stats: Arc::clone(&self.stats),
            resizer: FrameResizer::new(
                self.options.geometry,
                self.options.aspect_tolerance,
                self.options.orientation,
            ),
            output,
        };

        self.notifier.reset();
        self.stats.lock().reset();
        self.queue.open();

        let handle = std::thread::Builder::new()
            .name("vcam-pipeline".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.queue.close();
                PipelineError::Spawn(e)
            })?;

        *thread = Some(handle);
        *self.state.lock() = WorkerState::Running;
        tracing::info!(
            "Pipeline started ({}, {:?})",
            self.options.geometry,
            self.options.orientation
        );
        Ok(())
    }

    /// Stop the worker and wait for it to exit. No-op if idle.
    ///
    /// A frame already dequeued is finished; queued frames are discarded.
    /// The status baseline is reset so the next `start` reports afresh.
    pub fn stop(&self) {
        let mut thread = self.thread.lock();
        let Some(handle) = thread.take() else {
            return;
        };

        *self.state.lock() = WorkerState::Stopping;
        let discarded = self.queue.close();
        self.stats.lock().record_drops(discarded as u64);
        if handle.join().is_err() {
            tracing::error!("Pipeline worker panicked");
        }

        self.notifier.reset();
        *self.state.lock() = WorkerState::Idle;
        tracing::info!(
            "Pipeline stopped ({discarded} queued frame(s) discarded, {} rejected while closed)",
            self.queue.dropped()
        );
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Copy a BGRA frame into the queue.
    ///
    /// Only malformed frames are errors. Frames arriving while the pipeline
    /// is not running are dropped silently.
    pub fn enqueue(&self, data: &[u8], width: u32, height: u32) -> Result<()> {
        if !self.queue.is_accepting() {
            self.stats.lock().record_drops(1);
            return Ok(());
        }
        let task = FrameTask::from_bgra(data, width, height)?;
        if !self.queue.push(task) {
            self.stats.lock().record_drops(1);
            tracing::trace!("Dropped {width}x{height} frame: pipeline stopping");
        }
        Ok(())
    }

    /// Frames waiting for the worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Register the status callback, replacing any previous observer.
    pub fn set_observer(&self, callback: StatusCallback) {
        self.notifier.set_observer(callback);
    }

    /// Receive status changes through a bounded channel instead of a
    /// callback. Replaces any previous observer.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<StatusEvent> {
        self.notifier.subscribe(capacity)
    }

    pub fn clear_observer(&self) {
        self.notifier.clear_observer();
    }

    pub fn list_devices(&self) -> std::result::Result<Vec<DeviceInfo>, DeviceError> {
        self.session.lock().list_devices()
    }

    /// Bind the virtual camera at `path`, replacing any current binding.
    ///
    /// Returns `Ok` on success; otherwise the error is logged and mapped to
    /// the status the embedding layer should show.
    pub fn bind(&self, path: &DevicePath) -> StatusCode {
        match self.try_bind(path) {
            Ok(()) => StatusCode::Ok,
            Err(e) => {
                tracing::warn!("Failed to bind {path}: {e}");
                e.status()
            }
        }
    }

    /// Like [`bind`](Self::bind), keeping the full error.
    pub fn try_bind(&self, path: &DevicePath) -> std::result::Result<(), DeviceError> {
        self.session.lock().bind(path)
    }

    /// Release the current binding. Frames keep flowing and report
    /// `NoActiveDevice` until the next bind.
    pub fn unbind(&self) {
        self.session.lock().unbind();
    }

    pub fn bound_device(&self) -> Option<DevicePath> {
        self.session.lock().bound_path().cloned()
    }

    /// Last status reported since `start`, if any.
    pub fn last_status(&self) -> Option<StatusCode> {
        self.notifier.last_reported()
    }

    /// Take a snapshot of delivery stats for this session.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot()
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the worker thread. The output buffer and the resizer's
/// tables are never touched from outside it.
struct Worker {
    geometry: TargetGeometry,
    queue: Arc<FrameQueue>,
    session: Arc<Mutex<DeviceSession>>,
    notifier: Arc<StatusNotifier>,
    stats: Arc<Mutex<DiagnosticStats>>,
    resizer: FrameResizer,
    output: Vec<u8>,
}

impl Worker {
    fn run(&mut self) {
        tracing::info!("Pipeline worker started");
        while let Dequeued::Task(task) = self.queue.pop_blocking() {
            self.process(&task);
        }
        tracing::info!("Pipeline worker exiting");
    }

    fn process(&mut self, task: &FrameTask) {
        let strategy =
            self.resizer
                .render(task.data(), task.width(), task.height(), &mut self.output);
        tracing::trace!(
            "Rendered {}x{} frame via {strategy:?}",
            task.width(),
            task.height()
        );

        let status = self
            .session
            .lock()
            .submit(&self.output, self.geometry.width, self.geometry.height);

        {
            let mut stats = self.stats.lock();
            if status.is_ok() {
                stats.record_delivery(self.output.len(), task.enqueued_at());
            } else {
                stats.record_failure();
            }
        }

        self.notifier.report(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::dummy::DummyBackend;
    use std::time::{Duration, Instant};

    const SMALL: TargetGeometry = TargetGeometry::new(8, 4);

    fn pipeline() -> (Arc<DummyBackend>, FramePipeline) {
        let backend = Arc::new(DummyBackend::new());
        let options = PipelineOptions {
            geometry: SMALL,
            ..PipelineOptions::default()
        };
        (backend.clone(), FramePipeline::new(backend, options))
    }

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0x40; (width * height * 4) as usize]
    }

    fn recording(pipeline: &FramePipeline) -> Arc<Mutex<Vec<StatusCode>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        pipeline.set_observer(Arc::new(move |code: StatusCode, _: &str| {
            sink.lock().push(code);
        }));
        seen
    }

    /// Poll until `done` holds or a generous timeout expires.
    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    #[test]
    fn allocate_output_has_requested_length() {
        let buffer = allocate_output(SMALL.buffer_len()).unwrap();
        assert_eq!(buffer.len(), 96);
    }

    #[test]
    fn allocate_output_reports_impossible_sizes() {
        let result = allocate_output(usize::MAX);
        assert!(matches!(result, Err(PipelineError::Allocation { .. })));
    }

    #[test]
    fn options_follow_settings() {
        let settings = PipelineSettings {
            output_width: 640,
            output_height: 360,
            aspect_tolerance: 0.05,
            orientation: Orientation::Mirror,
            ..PipelineSettings::default()
        };
        let options = PipelineOptions::from(&settings);
        assert_eq!(options.geometry, TargetGeometry::new(640, 360));
        assert_eq!(options.aspect_tolerance, 0.05);
        assert_eq!(options.orientation, Orientation::Mirror);
    }

    #[test]
    fn start_rejects_zero_sized_geometry() {
        for geometry in [TargetGeometry::new(0, 4), TargetGeometry::new(8, 0)] {
            let options = PipelineOptions {
                geometry,
                ..PipelineOptions::default()
            };
            let pipeline = FramePipeline::new(Arc::new(DummyBackend::new()), options);
            assert!(matches!(
                pipeline.start(),
                Err(PipelineError::InvalidGeometry { .. })
            ));
            assert_eq!(pipeline.state(), WorkerState::Idle);
            assert!(pipeline.enqueue(&frame(8, 4), 8, 4).is_ok());
            assert_eq!(pipeline.pending(), 0);
        }
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (_, pipeline) = pipeline();
        assert_eq!(pipeline.state(), WorkerState::Idle);
        pipeline.stop();

        pipeline.start().unwrap();
        pipeline.start().unwrap();
        assert!(pipeline.is_running());

        pipeline.stop();
        pipeline.stop();
        assert_eq!(pipeline.state(), WorkerState::Idle);
    }

    #[test]
    fn delivers_frames_to_bound_device() {
        let (backend, pipeline) = pipeline();
        assert_eq!(pipeline.bind(&DummyBackend::default_path()), StatusCode::Ok);
        pipeline.start().unwrap();

        for _ in 0..5 {
            pipeline.enqueue(&frame(16, 8), 16, 8).unwrap();
        }
        assert!(wait_until(|| backend.frames_received() == 5));
        assert_eq!(backend.last_geometry(), Some((8, 4, 24)));
        assert_eq!(pipeline.diagnostics().frames_delivered, 5);
        pipeline.stop();
    }

    #[test]
    fn unbound_frames_are_consumed_and_reported_once() {
        let (_, pipeline) = pipeline();
        let seen = recording(&pipeline);
        pipeline.start().unwrap();

        for _ in 0..4 {
            pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        }
        assert!(wait_until(|| pipeline.diagnostics().frames_failed == 4));
        assert_eq!(*seen.lock(), vec![StatusCode::NoActiveDevice]);
        assert_eq!(pipeline.pending(), 0);
        pipeline.stop();
    }

    #[test]
    fn enqueue_while_idle_is_silently_dropped() {
        let (backend, pipeline) = pipeline();
        pipeline.bind(&DummyBackend::default_path());
        assert!(pipeline.enqueue(&frame(8, 4), 8, 4).is_ok());
        assert_eq!(pipeline.pending(), 0);
        assert_eq!(pipeline.diagnostics().frames_dropped, 1);
        assert_eq!(backend.frames_received(), 0);
    }

    #[test]
    fn malformed_frames_are_rejected_at_enqueue() {
        let (_, pipeline) = pipeline();
        pipeline.start().unwrap();
        let result = pipeline.enqueue(&[0u8; 10], 8, 4);
        assert!(matches!(result, Err(PipelineError::InvalidFrame(_))));
        pipeline.stop();
    }

    #[test]
    fn overflowing_dimensions_are_rejected_and_worker_keeps_running() {
        let (backend, pipeline) = pipeline();
        pipeline.bind(&DummyBackend::default_path());
        pipeline.start().unwrap();

        let result = pipeline.enqueue(&[0u8; 16], 1 << 31, 1 << 31);
        assert!(matches!(result, Err(PipelineError::InvalidFrame(_))));
        assert_eq!(pipeline.pending(), 0);

        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| backend.frames_received() == 1));
        assert!(pipeline.is_running());
        pipeline.stop();
    }

    #[test]
    fn stop_resets_status_baseline() {
        let (_, pipeline) = pipeline();
        let seen = recording(&pipeline);
        pipeline.bind(&DummyBackend::default_path());

        pipeline.start().unwrap();
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| seen.lock().len() == 1));
        pipeline.stop();
        assert_eq!(pipeline.last_status(), None);

        pipeline.start().unwrap();
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| seen.lock().len() == 2));
        pipeline.stop();
        assert_eq!(*seen.lock(), vec![StatusCode::Ok, StatusCode::Ok]);
    }

    #[test]
    fn transport_readiness_changes_are_reported() {
        let (backend, pipeline) = pipeline();
        let seen = recording(&pipeline);
        pipeline.bind(&DummyBackend::default_path());
        backend.set_ready(false);
        pipeline.start().unwrap();

        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| seen.lock().len() == 1));
        backend.set_ready(true);
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| seen.lock().len() == 2));
        pipeline.stop();

        assert_eq!(
            *seen.lock(),
            vec![StatusCode::TransportNotReady, StatusCode::Ok]
        );
    }

    #[test]
    fn failed_submission_does_not_stop_worker() {
        let (backend, pipeline) = pipeline();
        let seen = recording(&pipeline);
        pipeline.bind(&DummyBackend::default_path());
        backend.set_failing(true);
        pipeline.start().unwrap();

        for _ in 0..3 {
            pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        }
        assert!(wait_until(|| pipeline.diagnostics().frames_failed == 3));
        backend.set_failing(false);
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| backend.frames_received() == 1));
        pipeline.stop();

        assert_eq!(*seen.lock(), vec![StatusCode::SubmitFailed, StatusCode::Ok]);
    }

    #[test]
    fn bind_unknown_device_reports_no_active_device() {
        let (_, pipeline) = pipeline();
        let status = pipeline.bind(&DevicePath::new("dummy://nowhere"));
        assert_eq!(status, StatusCode::NoActiveDevice);
        assert_eq!(pipeline.bound_device(), None);
    }

    #[test]
    fn subscription_channel_receives_transitions() {
        let (_, pipeline) = pipeline();
        let mut rx = pipeline.subscribe(8);
        pipeline.start().unwrap();
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        pipeline.enqueue(&frame(8, 4), 8, 4).unwrap();
        assert!(wait_until(|| pipeline.diagnostics().frames_failed == 2));
        pipeline.stop();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.code, StatusCode::NoActiveDevice);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_running_pipeline_joins_worker() {
        let (backend, pipeline) = pipeline();
        pipeline.bind(&DummyBackend::default_path());
        pipeline.start().unwrap();
        drop(pipeline);
        assert_eq!(backend.active_bindings(), 0);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn frame_pipeline_is_send_and_sync() {
        assert_send_sync::<FramePipeline>();
    }
}
