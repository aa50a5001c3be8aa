//! The scheduler host: launches runners, reports, and shuts them down.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{
    CancellationSignal, JoinStatus, Task, TaskHandle, TaskId, TaskRunner, WaitOutcome,
};
use crate::output::OutputSink;
use crate::scheduler::PriorityHint;
use crate::tasks::{BackgroundWorkTask, PeriodicDisplayTask};
use crate::telemetry::MetricsSnapshot;
use std::time::{Duration, Instant};

/// Priority reported for the host's own thread, which is never re-prioritised.
const HOST_PRIORITY: PriorityHint = PriorityHint::Normal;

/// Owns every running task of one program.
///
/// [`launch`](Self::launch) never waits on the task it starts. A stop request
/// can come from any thread through [`stop_handle`](Self::stop_handle);
/// [`shutdown`](Self::shutdown) cancels everything and joins against a single
/// deadline.
#[derive(Debug)]
pub struct SchedulerHost {
    config: Config,
    sink: OutputSink,
    runner: TaskRunner,
    handles: Vec<TaskHandle>,
    stop: CancellationSignal,
    shut_down: bool,
}

impl SchedulerHost {
    pub fn new(config: Config, sink: OutputSink) -> Result<Self> {
        config.validate()?;
        let runner = TaskRunner::new(&config);

        Ok(Self {
            config,
            sink,
            runner,
            handles: Vec::new(),
            stop: CancellationSignal::new(),
            shut_down: false,
        })
    }

    /// Host running the clock at the highest hint and the filler work at the
    /// lowest, both already started.
    pub fn demo(config: Config, sink: OutputSink) -> Result<Self> {
        let mut host = Self::new(config, sink)?;

        let clock = PeriodicDisplayTask::from_config(&host.config, host.sink.clone());
        host.launch(clock, PriorityHint::MAX)?;

        let background = BackgroundWorkTask::from_config(&host.config);
        host.launch(background, PriorityHint::MIN)?;

        Ok(host)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn launch<T: Task>(&mut self, task: T, priority: PriorityHint) -> Result<TaskId> {
        if self.shut_down {
            return Err(Error::other("scheduler host is shut down"));
        }

        let handle = self.runner.start(task, priority)?;
        let id = handle.id();
        tracing::debug!(task = handle.name(), %id, %priority, "launched");
        self.handles.push(handle);
        Ok(id)
    }

    /// Print the host's own priority and the hint of every launched task.
    pub fn report(&self) {
        self.sink.write_line(&format!(
            "Main thread continues its work (Priority: {})",
            HOST_PRIORITY.level()
        ));
        for handle in &self.handles {
            self.sink.write_line(&format!(
                "{} Priority: {}",
                thread_title(handle.name()),
                handle.priority().level()
            ));
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskHandle> {
        self.handles.iter()
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskHandle> {
        self.handles.iter().find(|h| h.id() == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskHandle> {
        self.handles.iter_mut().find(|h| h.id() == id)
    }

    pub fn live_tasks(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.runner.metrics().snapshot()
    }

    /// Signal that asks this host to stop. Safe to trigger from any thread,
    /// any number of times.
    pub fn stop_handle(&self) -> CancellationSignal {
        self.stop.clone()
    }

    /// Block until a stop is requested, or until `timeout` if given.
    /// Returns whether a stop was requested.
    pub fn wait_for_stop(&self, timeout: Option<Duration>) -> bool {
        match timeout {
            Some(timeout) => self.stop.wait_timeout(timeout) == WaitOutcome::Cancelled,
            None => {
                self.stop.wait();
                true
            }
        }
    }

    /// Cancel every task, then join them all within `config.shutdown_grace`.
    ///
    /// Tasks still running at the deadline are reported as `TimedOut` and
    /// detached. Only the first call does any work.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.shut_down {
            return ShutdownReport::default();
        }
        self.shut_down = true;
        self.stop.cancel();

        let started = Instant::now();
        for handle in &self.handles {
            handle.cancel();
        }

        // A grace too large to form a deadline means waiting without limit.
        let deadline = started.checked_add(self.config.shutdown_grace);
        let mut entries = Vec::with_capacity(self.handles.len());

        for mut handle in self.handles.drain(..) {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            let status = handle.join(remaining);

            if status.is_timed_out() {
                tracing::warn!(
                    task = handle.name(),
                    grace = ?self.config.shutdown_grace,
                    "task did not stop in time; abandoning it"
                );
            }

            entries.push(ShutdownEntry {
                id: handle.id(),
                name: handle.name().to_string(),
                priority: handle.priority(),
                status,
            });
        }

        self.sink.close_line();

        let report = ShutdownReport {
            entries,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            clean = report.is_clean(),
            elapsed = ?report.elapsed,
            metrics = ?self.metrics(),
            "shutdown complete"
        );
        report
    }
}

impl Drop for SchedulerHost {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}

/// "clock-display" -> "Clock Display Thread"
fn thread_title(task_name: &str) -> String {
    let mut title = String::with_capacity(task_name.len() + 7);
    for word in task_name.split(['-', '_']).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            title.extend(first.to_uppercase());
            title.push_str(chars.as_str());
            title.push(' ');
        }
    }
    title.push_str("Thread");
    title
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownEntry {
    pub id: TaskId,
    pub name: String,
    pub priority: PriorityHint,
    pub status: JoinStatus,
}

/// Final status of every task the host owned.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub entries: Vec<ShutdownEntry>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Every task thread was joined in time.
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|e| !e.status.is_timed_out())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShutdownEntry> {
        self.entries.iter().filter(|e| e.status.is_failed())
    }

    pub fn timed_out(&self) -> impl Iterator<Item = &ShutdownEntry> {
        self.entries.iter().filter(|e| e.status.is_timed_out())
    }

    pub fn status_of(&self, name: &str) -> Option<&JoinStatus> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{TaskContext, TaskOutcome};
    use std::thread;

    /// Ignores cancellation for a fixed time, like a stuck external call.
    struct Stubborn(Duration);

    impl Task for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        fn execute(&mut self, _ctx: &TaskContext) -> Result<TaskOutcome> {
            thread::sleep(self.0);
            Ok(TaskOutcome::Finished)
        }
    }

    fn config() -> Config {
        Config::builder()
            .display_interval(Duration::from_millis(20))
            .work_step_duration(Duration::from_millis(10))
            .shutdown_grace(Duration::from_secs(2))
            .apply_priorities(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_thread_title() {
        assert_eq!(thread_title("clock-display"), "Clock Display Thread");
        assert_eq!(thread_title("background-worker"), "Background Worker Thread");
        assert_eq!(thread_title("x"), "X Thread");
        assert_eq!(thread_title(""), "Thread");
    }

    #[test]
    fn test_report_lines() {
        let (sink, buffer) = OutputSink::capture();
        let config = Config::builder()
            .show_banner(false)
            .apply_priorities(false)
            .build()
            .unwrap();
        let mut host = SchedulerHost::demo(config, sink).unwrap();
        host.report();
        let report = host.shutdown();
        assert!(report.is_clean());

        let lines = buffer.lines();
        assert!(lines.contains(&"Main thread continues its work (Priority: 5)".to_string()));
        assert!(lines.contains(&"Clock Display Thread Priority: 10".to_string()));
        assert!(lines.contains(&"Background Worker Thread Priority: 1".to_string()));
    }

    #[test]
    fn test_demo_shutdown_is_clean() {
        let (sink, buffer) = OutputSink::capture();
        let mut host = SchedulerHost::demo(config(), sink).unwrap();
        assert_eq!(host.tasks().count(), 2);

        thread::sleep(Duration::from_millis(60));
        let report = host.shutdown();

        assert!(report.is_clean());
        assert_eq!(report.failures().count(), 0);
        assert_eq!(
            report.status_of(PeriodicDisplayTask::NAME),
            Some(&JoinStatus::Completed(TaskOutcome::Cancelled))
        );
        assert!(report
            .status_of(BackgroundWorkTask::NAME)
            .is_some_and(|s| s.is_completed()));
        assert!(buffer.contents().ends_with("Clock Thread interrupted and stopped.\n"));
        assert_eq!(host.live_tasks(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (sink, _buffer) = OutputSink::capture();
        let mut host = SchedulerHost::demo(config(), sink).unwrap();

        assert_eq!(host.shutdown().entries.len(), 2);
        assert!(host.shutdown().entries.is_empty());
    }

    #[test]
    fn test_launch_after_shutdown_fails() {
        let (sink, _buffer) = OutputSink::capture();
        let mut host = SchedulerHost::new(config(), sink).unwrap();
        host.shutdown();

        let result = host.launch(BackgroundWorkTask::new(), PriorityHint::Normal);
        assert!(result.is_err());
    }

    #[test]
    fn test_stop_handle_from_other_thread() {
        let (sink, _buffer) = OutputSink::capture();
        let host = SchedulerHost::new(config(), sink).unwrap();
        assert!(!host.wait_for_stop(Some(Duration::from_millis(10))));

        let stop = host.stop_handle();
        let requester = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stop.cancel();
        });

        assert!(host.wait_for_stop(None));
        requester.join().unwrap();
    }

    #[test]
    fn test_unresponsive_task_times_out() {
        let (sink, _buffer) = OutputSink::capture();
        let config = Config::builder()
            .shutdown_grace(Duration::from_millis(50))
            .apply_priorities(false)
            .build()
            .unwrap();
        let mut host = SchedulerHost::new(config, sink).unwrap();
        host.launch(Stubborn(Duration::from_millis(500)), PriorityHint::Normal)
            .unwrap();

        let report = host.shutdown();
        assert!(!report.is_clean());
        assert_eq!(report.timed_out().count(), 1);
        assert!(report.elapsed < Duration::from_millis(450));
        #[cfg(feature = "telemetry")]
        assert_eq!(host.metrics().join_timeouts, 1);
    }

    #[test]
    fn test_unbounded_grace_waits_for_every_task() {
        let (sink, _buffer) = OutputSink::capture();
        let config = Config::builder()
            .display_interval(Duration::from_millis(20))
            .work_step_duration(Duration::from_millis(10))
            .shutdown_grace(Duration::MAX)
            .apply_priorities(false)
            .build()
            .unwrap();
        let mut host = SchedulerHost::demo(config, sink).unwrap();
        host.launch(Stubborn(Duration::from_millis(100)), PriorityHint::Normal)
            .unwrap();

        let report = host.shutdown();
        assert!(report.is_clean());
        assert_eq!(report.entries.len(), 3);
        assert_eq!(
            report.status_of("stubborn"),
            Some(&JoinStatus::Completed(TaskOutcome::Finished))
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let (sink, _buffer) = OutputSink::capture();
        let mut host = SchedulerHost::new(config(), sink).unwrap();
        let id = host
            .launch(BackgroundWorkTask::new().steps(1), PriorityHint::Low)
            .unwrap();

        assert_eq!(host.task(id).map(|h| h.name()), Some(BackgroundWorkTask::NAME));
        let status = host
            .task_mut(id)
            .map(|h| h.join(Duration::from_secs(2)))
            .unwrap();
        assert_eq!(status, JoinStatus::Completed(TaskOutcome::Finished));
    }
}
