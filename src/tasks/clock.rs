//! Periodic clock display.

use super::Progress;
use crate::config::Config;
use crate::error::Result;
use crate::executor::{Task, TaskContext, TaskOutcome};
use crate::output::OutputSink;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::time::Duration;

pub const BANNER: &str = "Clock Thread started. Press Ctrl-C to stop.";
pub const SEPARATOR: &str = "----------------------------------------------";
pub const TIME_PREFIX: &str = "Current Time and Date: ";
pub const STOPPED: &str = "Clock Thread interrupted and stopped.";

/// 24-hour clock, then day-month-year.
pub const TIME_FORMAT: &str = "%H:%M:%S %d-%m-%Y";

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

type TimeSource = Box<dyn Fn() -> NaiveDateTime + Send>;

/// Refreshes `Current Time and Date: ...` in place on the sink every
/// `interval` until cancelled, then writes a final status line.
pub struct PeriodicDisplayTask {
    sink: OutputSink,
    interval: Duration,
    banner: bool,
    now: TimeSource,
    refreshes: Progress,
}

impl PeriodicDisplayTask {
    pub const NAME: &'static str = "clock-display";

    pub fn new(sink: OutputSink) -> Self {
        Self {
            sink,
            interval: Duration::from_secs(1),
            banner: true,
            now: Box::new(|| Local::now().naive_local()),
            refreshes: Progress::default(),
        }
    }

    pub fn from_config(config: &Config, sink: OutputSink) -> Self {
        Self::new(sink)
            .interval(config.display_interval)
            .banner(config.show_banner)
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }

    /// Replace the wall clock, e.g. with a fixed time in tests.
    pub fn time_source<F>(mut self, now: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + 'static,
    {
        self.now = Box::new(now);
        self
    }

    /// Number of refreshed lines written so far.
    pub fn refreshes(&self) -> Progress {
        self.refreshes.clone()
    }

    fn render(&self) -> String {
        format!("{}{}", TIME_PREFIX, format_timestamp(&(self.now)()))
    }
}

impl Task for PeriodicDisplayTask {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&mut self, ctx: &TaskContext) -> Result<TaskOutcome> {
        if self.banner {
            self.sink.write_line(BANNER);
            self.sink.write_line(SEPARATOR);
        }

        while !ctx.is_cancelled() {
            self.sink.refresh_line(&self.render());
            self.refreshes.bump();

            if ctx.sleep(self.interval).is_err() {
                break;
            }
        }

        self.sink.write_line(STOPPED);
        Ok(TaskOutcome::Cancelled)
    }
}

impl fmt::Debug for PeriodicDisplayTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicDisplayTask")
            .field("interval", &self.interval)
            .field("banner", &self.banner)
            .field("refreshes", &self.refreshes.get())
            .finish()
    }
}
