//! clockwork - concurrent tasks with priority hints and cooperative cancellation
//!
//! Every task runs on its own OS thread, owned by a [`TaskHandle`]. A task is
//! stopped by setting its cancellation signal; the task notices at its next
//! wait and winds down, and [`TaskHandle::join`] reports how it ended. Tasks
//! share console output through an [`OutputSink`] that never tears a line.
//!
//! # Quick Start
//!
//! ```no_run
//! use clockwork::prelude::*;
//! use std::time::Duration;
//!
//! let mut host = SchedulerHost::demo(Config::default(), OutputSink::stdout()).unwrap();
//! host.report();
//!
//! std::thread::sleep(Duration::from_secs(3));
//!
//! let report = host.shutdown();
//! assert!(report.is_clean());
//! ```
//!
//! # Features
//!
//! - **Dedicated threads**: one named OS thread per task
//! - **Priority hints**: best-effort thread niceness, never relied on
//! - **Interruptible waits**: cancellation wakes sleeping tasks immediately
//! - **Fault isolation**: a panicking task fails alone and reports through `join`
//! - **Telemetry**: lifecycle counters and cancellation latency (optional)

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod host;
pub mod output;
pub mod prelude;
pub mod scheduler;
pub mod tasks;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{CancellationSignal, JoinStatus, Task, TaskHandle, TaskOutcome, TaskRunner};
pub use host::{SchedulerHost, ShutdownReport};
pub use output::OutputSink;
pub use scheduler::PriorityHint;
