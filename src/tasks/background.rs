use super::Progress;
use crate::config::Config;
use crate::error::Result;
use crate::executor::{Task, TaskContext, TaskOutcome};
use std::thread;
use std::time::Duration;

/// Low-priority filler work: a bounded number of sleep/yield steps.
///
/// Produces no output. Stops at the next step boundary once cancelled.
#[derive(Debug)]
pub struct BackgroundWorkTask {
    steps: u32,
    step_duration: Duration,
    completed: Progress,
}

impl BackgroundWorkTask {
    pub const NAME: &'static str = "background-worker";

    pub fn new() -> Self {
        Self {
            steps: 50,
            step_duration: Duration::from_millis(200),
            completed: Progress::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .steps(config.work_steps)
            .step_duration(config.work_step_duration)
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn step_duration(mut self, step_duration: Duration) -> Self {
        self.step_duration = step_duration;
        self
    }

    pub fn completed_steps(&self) -> Progress {
        self.completed.clone()
    }
}

impl Default for BackgroundWorkTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for BackgroundWorkTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&mut self, ctx: &TaskContext) -> Result<TaskOutcome> {
        for _ in 0..self.steps {
            ctx.sleep(self.step_duration)?;
            self.completed.bump();
            thread::yield_now();
        }
        Ok(TaskOutcome::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::executor::{CancellationSignal, TaskId};
    use std::time::Instant;

    #[test]
    fn test_runs_all_steps() {
        let mut task = BackgroundWorkTask::new()
            .steps(5)
            .step_duration(Duration::from_millis(1));
        let completed = task.completed_steps();

        let ctx = TaskContext::new(TaskId::next(), CancellationSignal::new());
        assert_eq!(task.execute(&ctx).unwrap(), TaskOutcome::Finished);
        assert_eq!(completed.get(), 5);
    }

    #[test]
    fn test_zero_steps_finishes_immediately() {
        let mut task = BackgroundWorkTask::new().steps(0);
        let ctx = TaskContext::new(TaskId::next(), CancellationSignal::new());
        assert_eq!(task.execute(&ctx).unwrap(), TaskOutcome::Finished);
    }

    #[test]
    fn test_cancelled_task_skips_remaining_steps() {
        let mut task = BackgroundWorkTask::new()
            .steps(1_000)
            .step_duration(Duration::from_secs(10));
        let completed = task.completed_steps();

        let signal = CancellationSignal::new();
        let ctx = TaskContext::new(TaskId::next(), signal.clone());
        signal.cancel();

        let start = Instant::now();
        assert!(matches!(task.execute(&ctx), Err(Error::Interrupted)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_from_config() {
        let config = Config::builder()
            .work_steps(7)
            .work_step_duration(Duration::from_millis(30))
            .build()
            .unwrap();
        let task = BackgroundWorkTask::from_config(&config);
        assert_eq!(task.steps, 7);
        assert_eq!(task.step_duration, Duration::from_millis(30));
    }
}
