pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{
    CancellationSignal, JoinStatus, PanicStrategy, Task, TaskContext, TaskFault, TaskHandle,
    TaskId, TaskOutcome, TaskRunner, TaskState,
};
pub use crate::host::{SchedulerHost, ShutdownReport};
pub use crate::output::{CaptureBuffer, OutputSink};
pub use crate::scheduler::PriorityHint;
pub use crate::tasks::{BackgroundWorkTask, PeriodicDisplayTask};

pub use crate::telemetry::{Metrics, MetricsSnapshot};
