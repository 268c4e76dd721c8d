use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::convert::SRC_BYTES_PER_PIXEL;
use super::error::{PipelineError, Result};

/// One BGRA frame waiting to be delivered.
///
/// The pixels are copied at enqueue time, so the producer's buffer only has
/// to live for the duration of the call.
#[derive(Debug)]
pub struct FrameTask {
    data: Vec<u8>,
    width: u32,
    height: u32,
    enqueued_at: Instant,
}

impl FrameTask {
    /// Copy a BGRA frame, validating its length once here so the conversion
    /// loops never have to.
    pub fn from_bgra(data: &[u8], width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidFrame(format!(
                "zero-sized frame {width}x{height}"
            )));
        }
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(SRC_BYTES_PER_PIXEL))
            .ok_or_else(|| {
                PipelineError::InvalidFrame(format!("{width}x{height} BGRA frame is too large"))
            })?;
        if data.len() < needed {
            return Err(PipelineError::InvalidFrame(format!(
                "{width}x{height} BGRA frame needs {needed} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data: data[..needed].to_vec(),
            width,
            height,
            enqueued_at: Instant::now(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

/// Result of a blocking dequeue.
#[derive(Debug)]
pub enum Dequeued {
    Task(FrameTask),
    Stopped,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<FrameTask>,
    /// Producers may append.
    accepting: bool,
    /// The worker must exit at its next wait point.
    stopping: bool,
    dropped: u64,
}

/// FIFO hand-off between the producer and the pipeline worker.
///
/// The contents and the stop flag share one lock, so a push can never slip
/// in after `close()` has drained the queue.
pub struct FrameQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl FrameQueue {
    /// Create a closed queue. Pushes are dropped until [`open`](Self::open).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
        }
    }

    /// Start accepting frames and clear any previous stop signal.
    pub fn open(&self) {
        let mut state = self.state.lock();
        state.accepting = true;
        state.stopping = false;
    }

    /// Append a task. Returns `false` (and drops the task) when closed.
    pub fn push(&self, task: FrameTask) -> bool {
        let mut state = self.state.lock();
        if !state.accepting {
            state.dropped += 1;
            return false;
        }
        state.tasks.push_back(task);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Block until a task is available or the queue is closed.
    ///
    /// A pending stop wins over queued tasks.
    pub fn pop_blocking(&self) -> Dequeued {
        let mut state = self.state.lock();
        loop {
            if state.stopping {
                return Dequeued::Stopped;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Dequeued::Task(task);
            }
            self.available.wait(&mut state);
        }
    }

    /// Stop accepting, signal the worker and discard queued tasks.
    ///
    /// Returns the number of discarded tasks.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.accepting = false;
        state.stopping = true;
        let discarded = state.tasks.len();
        state.tasks.clear();
        drop(state);
        self.available.notify_all();
        discarded
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    /// Frames rejected because the queue was closed.
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
