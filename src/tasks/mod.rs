//! Concrete tasks.

pub mod background;
pub mod clock;

pub use background::BackgroundWorkTask;
pub use clock::{format_timestamp, PeriodicDisplayTask};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read-only view of a task's progress counter, usable after the task has
/// been moved onto its thread.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU64>);

impl Progress {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn bump(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}
