use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::status::{StatusCode, StatusEvent};

/// Observer invoked on the worker thread with the new status and its message.
///
/// Must return quickly: frame delivery is stalled while it runs.
pub type StatusCallback = Arc<dyn Fn(StatusCode, &str) + Send + Sync>;

#[derive(Clone)]
enum Observer {
    Callback(StatusCallback),
    Channel(mpsc::Sender<StatusEvent>),
}

#[derive(Default)]
struct NotifierState {
    observer: Option<Observer>,
    /// `None` until something has been reported since the last reset.
    last: Option<StatusCode>,
}

/// Edge-triggered status reporting with a single observer.
///
/// The observer only hears about changes: N identical statuses in a row
/// produce one notification.
pub struct StatusNotifier {
    state: Mutex<NotifierState>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NotifierState::default()),
        }
    }

    /// Register a callback, replacing any previous observer.
    ///
    /// The new observer starts from a clean baseline, so it hears the next
    /// status even if it equals the last one reported.
    pub fn set_observer(&self, callback: StatusCallback) {
        self.replace(Some(Observer::Callback(callback)));
    }

    /// Register a bounded channel as the observer, replacing any previous one.
    ///
    /// Events are sent with `try_send`; a full channel defers the event until
    /// the same status is reported again.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<StatusEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.replace(Some(Observer::Channel(tx)));
        rx
    }

    pub fn clear_observer(&self) {
        self.replace(None);
    }

    fn replace(&self, observer: Option<Observer>) {
        let mut state = self.state.lock();
        state.observer = observer;
        state.last = None;
    }

    /// Record a submission result. Returns `true` if it was a transition
    /// that reached the observer.
    ///
    /// The observer is invoked after the lock is released so it may call
    /// back into the notifier. An event that does not fit in a full channel
    /// leaves the previous baseline in place, so the next report of the same
    /// status retries the delivery.
    pub fn report(&self, status: StatusCode) -> bool {
        let (previous, observer) = {
            let mut state = self.state.lock();
            if state.last == Some(status) {
                return false;
            }
            let previous = state.last.replace(status);
            (previous, state.observer.clone())
        };

        if let Some(Observer::Channel(tx)) = &observer {
            match tx.try_send(StatusEvent::from(status)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.restore(status, previous);
                    tracing::debug!("Status channel full, deferring '{status}' event");
                    return false;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("Status channel closed, dropping '{status}' event");
                }
            }
        }

        if status.is_ok() {
            tracing::info!("Virtual camera status: {status}");
        } else {
            tracing::warn!("Virtual camera status: {status}");
        }

        if let Some(Observer::Callback(callback)) = observer {
            callback(status, status.message());
        }
        true
    }

    /// Roll the baseline back after an undelivered transition, unless a
    /// newer report or observer change has already moved it.
    fn restore(&self, attempted: StatusCode, previous: Option<StatusCode>) {
        let mut state = self.state.lock();
        if state.last == Some(attempted) {
            state.last = previous;
        }
    }

    /// Forget the last reported status.
    pub fn reset(&self) {
        self.state.lock().last = None;
    }

    pub fn last_reported(&self) -> Option<StatusCode> {
        self.state.lock().last
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}
