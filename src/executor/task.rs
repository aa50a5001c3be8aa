//! Task representation and execution.

use super::cancel::{CancellationSignal, WaitOutcome};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unit of work executed on its own thread.
///
/// Implementations must check `ctx` at every suspension point. Waiting through
/// [`TaskContext::sleep`] does that automatically: it fails with
/// [`Error::Interrupted`] as soon as cancellation is requested, and the runner
/// treats that error as a normal cancelled exit.
pub trait Task: Send + 'static {
    fn name(&self) -> &str;

    fn execute(&mut self, ctx: &TaskContext) -> Result<TaskOutcome>;
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&mut self, ctx: &TaskContext) -> Result<TaskOutcome> {
        (**self).execute(ctx)
    }
}

/// How a task body ended when it did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Ran to its natural end.
    Finished,
    /// Stopped because cancellation was requested.
    Cancelled,
}

/// Lifecycle of a task as seen by its runner. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum TaskState {
    Idle = 0,
    Running = 1,
    CancelRequested = 2,
    Terminated = 3,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Idle,
            1 => TaskState::Running,
            2 => TaskState::CancelRequested,
            _ => TaskState::Terminated,
        }
    }
}

/// Atomic cell holding a [`TaskState`], shared between runner thread and handle.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TaskState::Idle as u8)))
    }

    pub(crate) fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` unless the cell is already at or past it.
    pub(crate) fn advance(&self, next: TaskState) {
        self.0.fetch_max(next as u8, Ordering::AcqRel);
    }
}

/// Per-run view handed to [`Task::execute`].
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    cancel: CancellationSignal,
}

impl TaskContext {
    pub fn new(id: TaskId, cancel: CancellationSignal) -> Self {
        Self { id, cancel }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    /// Interruptible sleep.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        match self.cancel.wait_timeout(duration) {
            WaitOutcome::Elapsed => Ok(()),
            WaitOutcome::Cancelled => Err(Error::Interrupted),
        }
    }
}
