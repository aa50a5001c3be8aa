//! Task execution infrastructure.
//!
//! This module provides the task abstraction, cooperative cancellation, panic
//! isolation and the per-task thread runner.

pub mod cancel;
pub mod panic_handler;
pub mod runner;
pub mod task;

pub use cancel::{CancellationSignal, WaitOutcome};
pub use panic_handler::{PanicHandler, PanicStrategy, TaskFault};
pub use runner::{JoinStatus, TaskHandle, TaskRunner};
pub use task::{Task, TaskContext, TaskId, TaskOutcome, TaskState};
