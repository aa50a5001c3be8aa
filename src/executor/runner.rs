//! Task runners: one dedicated thread per task.
//!
//! [`TaskRunner::start`] spawns a named thread, applies the priority hint on
//! that thread, and runs the task body behind the panic handler. The terminal
//! status travels back over a one-slot channel, which is what lets
//! [`TaskHandle::join`] wait with a timeout and be retried.

use super::cancel::CancellationSignal;
use super::panic_handler::{PanicHandler, TaskFault};
use super::task::{StateCell, Task, TaskContext, TaskId, TaskOutcome, TaskState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduler::PriorityHint;
use crate::telemetry::Metrics;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Result of [`TaskHandle::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinStatus {
    /// The task thread terminated normally.
    Completed(TaskOutcome),
    /// The timeout elapsed first. The task keeps running; join may be retried.
    TimedOut,
    /// The task body panicked or returned an error.
    Failed(TaskFault),
}

impl JoinStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, JoinStatus::Completed(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, JoinStatus::TimedOut)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JoinStatus::Failed(_))
    }

    pub fn fault(&self) -> Option<&TaskFault> {
        match self {
            JoinStatus::Failed(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Spawns tasks onto their own threads using one set of thread options.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    thread_name_prefix: String,
    stack_size: Option<usize>,
    apply_priorities: bool,
    panic_handler: Arc<PanicHandler>,
    metrics: Arc<Metrics>,
}

impl TaskRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            thread_name_prefix: config.thread_name_prefix.clone(),
            stack_size: config.stack_size,
            apply_priorities: config.apply_priorities,
            panic_handler: Arc::new(PanicHandler::new(config.panic_strategy)),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn panic_count(&self) -> usize {
        self.panic_handler.panic_count()
    }

    /// Launch `task` on a new thread and return immediately.
    ///
    /// Fails only if the OS refuses to create the thread.
    pub fn start<T: Task>(&self, task: T, priority: PriorityHint) -> Result<TaskHandle> {
        let id = TaskId::next();
        let name = task.name().to_string();
        let cancel = CancellationSignal::new();
        let state = StateCell::new();
        let (done_tx, done_rx) = bounded(1);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.thread_name_prefix, name));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let ctx = TaskContext::new(id, cancel.clone());
        let thread_state = state.clone();
        let panic_handler = self.panic_handler.clone();
        let metrics = self.metrics.clone();
        let apply_priorities = self.apply_priorities;
        let task_name = name.clone();

        let thread = builder
            .spawn(move || {
                if apply_priorities {
                    priority.apply_to_current_thread();
                }
                thread_state.advance(TaskState::Running);
                tracing::debug!(task = %task_name, id = %ctx.id(), %priority, "task running");

                // The task is dropped before the status is published, so a
                // join that sees the status never waits on a destructor.
                let result = panic_handler.execute(&task_name, || {
                    let mut task = task;
                    let result = task.execute(&ctx);
                    drop(task);
                    result
                });
                let status = match result {
                    Ok(Ok(outcome)) => JoinStatus::Completed(outcome),
                    Ok(Err(Error::Interrupted)) => JoinStatus::Completed(TaskOutcome::Cancelled),
                    Ok(Err(e)) => {
                        tracing::error!(task = %task_name, "task returned an error: {}", e);
                        JoinStatus::Failed(TaskFault::new(task_name.as_str(), e.to_string()))
                    }
                    Err(fault) => JoinStatus::Failed(fault),
                };

                record_terminal_status(&metrics, &status, ctx.cancellation());
                thread_state.advance(TaskState::Terminated);
                tracing::debug!(task = %task_name, id = %ctx.id(), ?status, "task terminated");

                let _ = done_tx.send(status);
            })
            .map_err(Error::Spawn)?;

        self.metrics.record_task_started();

        Ok(TaskHandle {
            id,
            name,
            priority,
            cancel,
            state,
            done_rx,
            thread: Some(thread),
            status: None,
            metrics: self.metrics.clone(),
        })
    }
}

fn record_terminal_status(metrics: &Metrics, status: &JoinStatus, cancel: &CancellationSignal) {
    match status {
        JoinStatus::Completed(TaskOutcome::Finished) => metrics.record_task_finished(),
        JoinStatus::Completed(TaskOutcome::Cancelled) => metrics.record_task_cancelled(),
        JoinStatus::Failed(_) => metrics.record_task_failed(),
        JoinStatus::TimedOut => {}
    }

    if let Some(requested_at) = cancel.requested_at() {
        metrics.record_cancel_latency(requested_at.elapsed());
    }
}

/// Owner of one running task: its thread, its cancellation signal and its
/// completion channel.
///
/// Dropping a handle whose task is still running cancels the task and detaches
/// the thread.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    name: String,
    priority: PriorityHint,
    cancel: CancellationSignal,
    state: StateCell,
    done_rx: Receiver<JoinStatus>,
    thread: Option<JoinHandle<()>>,
    status: Option<JoinStatus>,
    metrics: Arc<Metrics>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> PriorityHint {
        self.priority
    }

    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// Request cooperative cancellation. Only the first call has an effect;
    /// it returns `true`.
    pub fn cancel(&self) -> bool {
        let first = self.cancel.cancel();
        if first {
            self.state.advance(TaskState::CancelRequested);
            tracing::debug!(task = %self.name, id = %self.id, "cancellation requested");
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Terminated
    }

    /// Wait up to `timeout` for the task thread to terminate.
    ///
    /// Once a terminal status has been observed it is cached and every later
    /// call returns it immediately. A zero timeout polls.
    pub fn join(&mut self, timeout: Duration) -> JoinStatus {
        if let Some(status) = &self.status {
            return status.clone();
        }

        let received = if timeout.is_zero() {
            self.done_rx.try_recv().map_err(|e| match e {
                TryRecvError::Empty => RecvTimeoutError::Timeout,
                TryRecvError::Disconnected => RecvTimeoutError::Disconnected,
            })
        } else {
            self.done_rx.recv_timeout(timeout)
        };

        let status = match received {
            Ok(status) => status,
            Err(RecvTimeoutError::Timeout) => {
                self.metrics.record_join_timeout();
                return JoinStatus::TimedOut;
            }
            Err(RecvTimeoutError::Disconnected) => JoinStatus::Failed(TaskFault::new(
                self.name.as_str(),
                "execution context exited without reporting a status",
            )),
        };

        self.reap();
        self.status = Some(status.clone());
        status
    }

    /// Like [`join`](Self::join), but as a `Result`: a cancelled or finished
    /// task is `Ok`, a timeout or fault is an error.
    pub fn join_result(&mut self, timeout: Duration) -> Result<TaskOutcome> {
        match self.join(timeout) {
            JoinStatus::Completed(outcome) => Ok(outcome),
            JoinStatus::TimedOut => Err(Error::join_timeout(self.name.as_str(), timeout)),
            JoinStatus::Failed(fault) => Err(Error::TaskFault(fault)),
        }
    }

    /// Cancel, then wait up to `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> JoinStatus {
        self.cancel();
        let started = Instant::now();
        let status = self.join(timeout);
        tracing::debug!(task = %self.name, elapsed = ?started.elapsed(), ?status, "stop");
        status
    }

    fn reap(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The status has been sent, so the thread is on its way out.
            if thread.join().is_err() {
                tracing::error!(task = %self.name, "task thread panicked after reporting");
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if self.thread.is_none() || self.is_finished() {
            return;
        }
        if self.cancel() {
            tracing::warn!(
                task = %self.name,
                id = %self.id,
                "task handle dropped while running; cancelled and detached"
            );
        } else {
            tracing::debug!(task = %self.name, id = %self.id, "detaching cancelled task");
        }
    }
}
