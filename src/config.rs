use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

const MIN_STACK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub display_interval: Duration,
    pub work_steps: u32,
    pub work_step_duration: Duration,

    /// Upper bound on the whole join phase of a shutdown, shared by all runners.
    pub shutdown_grace: Duration,

    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
    pub apply_priorities: bool,
    pub panic_strategy: PanicStrategy,
    pub show_banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_interval: Duration::from_millis(1000),
            work_steps: 50,
            work_step_duration: Duration::from_millis(200),
            shutdown_grace: Duration::from_secs(2),
            thread_name_prefix: "clockwork".to_string(),
            stack_size: Some(256 * 1024),
            apply_priorities: true,
            panic_strategy: PanicStrategy::default(),
            show_banner: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.display_interval.is_zero() {
            return Err(Error::config("display_interval must be > 0"));
        }

        if self.work_step_duration.is_zero() {
            return Err(Error::config("work_step_duration must be > 0"));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(Error::config(format!(
                    "stack_size too small (min {} bytes)",
                    MIN_STACK_SIZE
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn display_interval(mut self, interval: Duration) -> Self {
        self.config.display_interval = interval;
        self
    }

    pub fn work_steps(mut self, steps: u32) -> Self {
        self.config.work_steps = steps;
        self
    }

    pub fn work_step_duration(mut self, step: Duration) -> Self {
        self.config.work_step_duration = step;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn apply_priorities(mut self, apply: bool) -> Self {
        self.config.apply_priorities = apply;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn show_banner(mut self, show: bool) -> Self {
        self.config.show_banner = show;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
