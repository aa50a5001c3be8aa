//! Telemetry for task runners.
//!
//! Counts task lifecycle transitions and records how long cancelled tasks
//! take to wind down.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_task_started(&self) {}
        pub fn record_task_finished(&self) {}
        pub fn record_task_cancelled(&self) {}
        pub fn record_task_failed(&self) {}
        pub fn record_join_timeout(&self) {}
        pub fn record_cancel_latency(&self, _: Duration) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
    }

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
        pub fn tasks_terminated(&self) -> u64 { 0 }
        pub fn tasks_live(&self) -> u64 { 0 }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
