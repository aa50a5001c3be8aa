//! Cooperative cancellation.
//!
//! A [`CancellationSignal`] is a write-once flag shared between a runner and
//! the task it owns. Reads are a single atomic load; waits park on a condition
//! variable that [`CancellationSignal::cancel`] notifies, so a sleeping task
//! wakes as soon as it is asked to stop.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Result of an interruptible wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration passed without cancellation.
    Elapsed,
    /// The signal was set before or during the wait.
    Cancelled,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    requested_at: OnceLock<Instant>,
    lock: Mutex<()>,
    cond: Condvar,
}

/// Shared, write-once cancellation flag.
///
/// Clones observe the same flag. Once set it is never reset.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiter.
    ///
    /// Returns `true` only for the call that actually flipped the flag; later
    /// calls are no-ops.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.inner.requested_at.set(Instant::now());

        // Taking the lock orders this notify after any waiter that has checked
        // the flag but not yet parked.
        let _guard = self.inner.lock.lock();
        self.inner.cond.notify_all();
        true
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// When the flag was set, if it has been.
    pub fn requested_at(&self) -> Option<Instant> {
        self.inner.requested_at.get().copied()
    }

    /// Block for up to `timeout`, returning early on cancellation.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        if self.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        if timeout.is_zero() {
            return WaitOutcome::Elapsed;
        }

        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.wait();
                return WaitOutcome::Cancelled;
            }
        };

        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }

        if self.is_cancelled() {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::Elapsed
        }
    }

    /// Block until the flag is set.
    pub fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            self.inner.cond.wait(&mut guard);
        }
    }
}
