use serde::Serialize;
use std::time::Instant;

/// Collects delivery statistics for a pipeline session.
pub struct DiagnosticStats {
    delivered: u64,
    failed: u64,
    dropped: u64,
    total_bytes: u64,
    start_time: Instant,
    latency_us: u64,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub frames_delivered: u64,
    pub frames_failed: u64,
    pub frames_dropped: u64,
    pub drop_rate: f64,
    pub latency_ms: f64,
    pub bandwidth_bps: u64,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            delivered: 0,
            failed: 0,
            dropped: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            latency_us: 0,
        }
    }

    /// Record a frame accepted by the transport.
    ///
    /// Latency is measured from when the frame was enqueued.
    pub fn record_delivery(&mut self, bytes: usize, enqueued_at: Instant) {
        self.delivered += 1;
        self.total_bytes += bytes as u64;
        self.latency_us = enqueued_at.elapsed().as_micros() as u64;
    }

    /// Record a frame the transport did not accept.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Record frames discarded before reaching the worker.
    pub fn record_drops(&mut self, count: u64) {
        self.dropped += count;
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Delivered frames per second since the last reset.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.delivered as f64 / elapsed
    }

    /// Share of frames that never reached the consumer, as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let lost = self.failed + self.dropped;
        let total = self.delivered + lost;
        if total == 0 {
            return 0.0;
        }
        (lost as f64 / total as f64) * 100.0
    }

    /// Latest enqueue-to-delivery latency in milliseconds.
    pub fn latency_ms(&self) -> f64 {
        self.latency_us as f64 / 1000.0
    }

    /// Bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            frames_delivered: self.delivered,
            frames_failed: self.failed,
            frames_dropped: self.dropped,
            drop_rate: self.drop_rate(),
            latency_ms: self.latency_ms(),
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}
