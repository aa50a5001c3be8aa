//! Metrics collection for task lifecycles.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lifecycle counters shared by every runner of a host.
#[derive(Debug)]
pub struct Metrics {
    tasks_started: AtomicU64,
    tasks_finished: AtomicU64,
    tasks_cancelled: AtomicU64,
    tasks_failed: AtomicU64,
    join_timeouts: AtomicU64,

    // Time from cancel() to the task thread terminating, in microseconds.
    cancel_latency: Mutex<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        // Three significant figures, up to one hour.
        let histogram = Histogram::new_with_bounds(1, 3_600_000_000, 3)
            .expect("Failed to create histogram");

        Self {
            tasks_started: AtomicU64::new(0),
            tasks_finished: AtomicU64::new(0),
            tasks_cancelled: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            join_timeouts: AtomicU64::new(0),
            cancel_latency: Mutex::new(histogram),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_finished(&self) {
        self.tasks_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_cancelled(&self) {
        self.tasks_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join_timeout(&self) {
        self.join_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancel_latency(&self, latency: Duration) {
        let micros = (latency.as_micros() as u64).max(1);
        self.cancel_latency.lock().saturating_record(micros);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.cancel_latency.lock();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_started: self.tasks_started.load(Ordering::Relaxed),
            tasks_finished: self.tasks_finished.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            join_timeouts: self.join_timeouts.load(Ordering::Relaxed),
            cancellations_measured: histogram.len(),
            max_cancel_latency_us: histogram.max(),
            p99_cancel_latency_us: histogram.value_at_quantile(0.99),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_started: u64,
    pub tasks_finished: u64,
    pub tasks_cancelled: u64,
    pub tasks_failed: u64,
    pub join_timeouts: u64,
    pub cancellations_measured: u64,
    pub max_cancel_latency_us: u64,
    pub p99_cancel_latency_us: u64,
}

impl MetricsSnapshot {
    /// Tasks that have reached a terminal state.
    pub fn tasks_terminated(&self) -> u64 {
        self.tasks_finished + self.tasks_cancelled + self.tasks_failed
    }

    /// Tasks started but not yet terminated.
    pub fn tasks_live(&self) -> u64 {
        self.tasks_started.saturating_sub(self.tasks_terminated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_task_started();
        metrics.record_task_started();
        metrics.record_task_started();
        metrics.record_task_finished();
        metrics.record_task_failed();
        metrics.record_join_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_started, 3);
        assert_eq!(snapshot.tasks_terminated(), 2);
        assert_eq!(snapshot.tasks_live(), 1);
        assert_eq!(snapshot.join_timeouts, 1);
    }

    #[test]
    fn test_cancel_latency() {
        let metrics = Metrics::new();
        metrics.record_cancel_latency(Duration::from_millis(3));
        metrics.record_cancel_latency(Duration::from_millis(1));
        metrics.record_cancel_latency(Duration::ZERO);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cancellations_measured, 3);
        assert!(snapshot.max_cancel_latency_us >= 2_990);
        assert!(snapshot.max_cancel_latency_us <= 3_010);
    }
}
