//! clockwork: clock display plus low-priority background work.
//!
//! Starts the clock at the highest priority hint and a background worker at
//! the lowest, reports their priorities, and runs until Ctrl-C / SIGTERM (or
//! `--duration-secs`). On stop, every task is cancelled and joined within the
//! grace period.
//!
//! # Usage
//!
//! ```bash
//! clockwork
//! clockwork --interval-ms 250 --duration-secs 5
//! RUST_LOG=clockwork=debug clockwork
//! ```

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use clockwork::{CancellationSignal, Config, OutputSink, SchedulerHost};

/// Live clock on one thread, filler work on another, graceful shutdown on Ctrl-C.
#[derive(Parser, Debug)]
#[command(name = "clockwork", version, about)]
struct Cli {
    /// Clock refresh interval in milliseconds.
    #[arg(long, env = "CLOCKWORK_INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Number of background work steps.
    #[arg(long, env = "CLOCKWORK_WORK_STEPS", default_value_t = 50)]
    work_steps: u32,

    /// Duration of one background step in milliseconds.
    #[arg(long, env = "CLOCKWORK_STEP_MS", default_value_t = 200)]
    step_ms: u64,

    /// How long shutdown waits for tasks to stop, in milliseconds.
    #[arg(long, env = "CLOCKWORK_GRACE_MS", default_value_t = 2000)]
    grace_ms: u64,

    /// Stop on its own after this many seconds.
    #[arg(long, env = "CLOCKWORK_DURATION_SECS")]
    duration_secs: Option<u64>,

    /// Do not apply OS priority hints to task threads.
    #[arg(long)]
    no_priorities: bool,

    /// Skip the clock's startup banner.
    #[arg(long)]
    no_banner: bool,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "clockwork=debug").
    #[arg(long, env = "CLOCKWORK_LOG", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> clockwork::Result<Config> {
        Config::builder()
            .display_interval(Duration::from_millis(self.interval_ms))
            .work_steps(self.work_steps)
            .work_step_duration(Duration::from_millis(self.step_ms))
            .shutdown_grace(Duration::from_millis(self.grace_ms))
            .apply_priorities(!self.no_priorities)
            .show_banner(!self.no_banner)
            .build()
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so they never pass through the console sink.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.config()?;
    let signal_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Registered before any task starts; a signal in between is queued.
    let signals = StopSignals::register(&signal_runtime)?;

    let mut host = SchedulerHost::demo(config, OutputSink::stdout())?;
    host.report();

    let stop = host.stop_handle();
    let duration = cli.duration_secs.map(Duration::from_secs);
    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || signal_runtime.block_on(watch_for_stop(signals, stop, duration)))?;

    host.wait_for_stop(None);
    let report = host.shutdown();

    for entry in report.failures() {
        tracing::error!(task = %entry.name, status = ?entry.status, "task failed");
    }

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        let abandoned: Vec<_> = report.timed_out().map(|e| e.name.as_str()).collect();
        tracing::error!(?abandoned, "shutdown grace period elapsed with tasks still running");
        Ok(ExitCode::FAILURE)
    }
}

// ── Signal handling ──────────────────────────────────────────────────

/// Trip `stop` on SIGINT, SIGTERM, or when `duration` elapses.
async fn watch_for_stop(
    mut signals: StopSignals,
    stop: CancellationSignal,
    duration: Option<Duration>,
) {
    let timer = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = signals.recv() => tracing::info!("shutdown signal received"),
        _ = timer => tracing::info!("run duration elapsed"),
    }

    stop.cancel();
}

/// SIGINT and SIGTERM listeners.
struct StopSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl StopSignals {
    #[cfg(unix)]
    fn register(runtime: &tokio::runtime::Runtime) -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let _guard = runtime.enter();
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    fn register(_runtime: &tokio::runtime::Runtime) -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for SIGINT or SIGTERM.
    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {},
            _ = self.terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl_c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
