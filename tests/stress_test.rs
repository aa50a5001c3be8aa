use clockwork::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Writes numbered, fixed-shape lines as fast as it can until cancelled.
struct Chatter {
    name: String,
    sink: OutputSink,
    written: Arc<AtomicUsize>,
    refresh: bool,
}

impl Task for Chatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &TaskContext) -> Result<TaskOutcome> {
        let mut n = 0u32;
        while !ctx.is_cancelled() {
            let line = format!("[{}] message {:08}", self.name, n);
            if self.refresh {
                self.sink.refresh_line(&line);
            } else {
                self.sink.write_line(&line);
            }
            self.written.fetch_add(1, Ordering::Relaxed);
            n += 1;
            if n % 64 == 0 {
                ctx.sleep(Duration::from_micros(50))?;
            }
        }
        Ok(TaskOutcome::Cancelled)
    }
}

#[test]
fn test_many_writers_never_tear_lines() {
    let (sink, buffer) = OutputSink::capture();
    let config = Config::builder().apply_priorities(false).build().unwrap();
    let runner = TaskRunner::new(&config);
    let written = Arc::new(AtomicUsize::new(0));

    let priorities = [
        PriorityHint::Lowest,
        PriorityHint::Low,
        PriorityHint::Normal,
        PriorityHint::High,
        PriorityHint::Highest,
    ];

    let mut handles: Vec<_> = (0..10)
        .map(|i| {
            let task = Chatter {
                name: format!("chatter{:02}", i),
                sink: sink.clone(),
                written: written.clone(),
                refresh: i % 3 == 0,
            };
            runner.start(task, priorities[i % priorities.len()]).unwrap()
        })
        .collect();

    thread::sleep(Duration::from_millis(200));
    for handle in &handles {
        handle.cancel();
    }
    for handle in &mut handles {
        assert!(handle.join(Duration::from_secs(5)).is_completed());
    }

    let lines = buffer.lines();
    assert_eq!(lines.len(), written.load(Ordering::Relaxed));
    for line in &lines {
        // "[chatterNN] message NNNNNNNN"
        assert_eq!(line.len(), 28, "torn line {:?}", line);
        assert!(line.starts_with("[chatter"), "torn line {:?}", line);
        assert!(line[20..].bytes().all(|b| b.is_ascii_digit()), "torn line {:?}", line);
    }
}

#[test]
fn test_repeated_start_cancel_cycles() {
    let (sink, _buffer) = OutputSink::capture();
    let config = Config::builder()
        .apply_priorities(false)
        .build()
        .unwrap();
    let runner = TaskRunner::new(&config);

    for round in 0..50 {
        let mut clock = runner
            .start(
                PeriodicDisplayTask::new(sink.clone()).banner(false),
                PriorityHint::Highest,
            )
            .unwrap();
        let mut worker = runner
            .start(BackgroundWorkTask::new(), PriorityHint::Lowest)
            .unwrap();

        if round % 2 == 0 {
            thread::yield_now();
        }

        clock.cancel();
        worker.cancel();
        assert!(clock.join(Duration::from_secs(2)).is_completed());
        assert!(worker.join(Duration::from_secs(2)).is_completed());
    }

    #[cfg(feature = "telemetry")]
    {
        let snapshot = runner.metrics().snapshot();
        assert_eq!(snapshot.tasks_started, 100);
        assert_eq!(snapshot.tasks_cancelled, 100);
        assert_eq!(snapshot.tasks_live(), 0);
        assert_eq!(snapshot.cancellations_measured, 100);
    }
}

#[test]
fn test_many_hosts_shut_down_cleanly() {
    let hosts: Vec<_> = (0..8)
        .map(|_| {
            let (sink, _buffer) = OutputSink::capture();
            let config = Config::builder()
                .display_interval(Duration::from_millis(5))
                .work_step_duration(Duration::from_millis(5))
                .apply_priorities(false)
                .build()
                .unwrap();
            SchedulerHost::demo(config, sink).unwrap()
        })
        .collect();

    thread::sleep(Duration::from_millis(50));

    for mut host in hosts {
        let report = host.shutdown();
        assert!(report.is_clean());
        assert_eq!(report.entries.len(), 2);
    }
}
