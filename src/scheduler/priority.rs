use std::fmt;

/// Advisory scheduling preference for a task's thread.
///
/// This only biases the OS scheduler; nothing in the crate relies on it for
/// ordering or correctness. Ordered from least to most preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum PriorityHint {
    Lowest = 0,
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Highest = 4,
}

impl PriorityHint {
    pub const MIN: PriorityHint = PriorityHint::Lowest;
    pub const MAX: PriorityHint = PriorityHint::Highest;

    /// Position on the conventional 1..=10 thread priority scale.
    pub fn level(self) -> u8 {
        match self {
            PriorityHint::Lowest => 1,
            PriorityHint::Low => 3,
            PriorityHint::Normal => 5,
            PriorityHint::High => 7,
            PriorityHint::Highest => 10,
        }
    }

    /// Nearest hint for a 1..=10 level; out-of-range values clamp.
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=2 => PriorityHint::Lowest,
            3..=4 => PriorityHint::Low,
            5..=6 => PriorityHint::Normal,
            7..=9 => PriorityHint::High,
            _ => PriorityHint::Highest,
        }
    }

    /// Unix niceness used when the hint is applied to a thread.
    pub fn niceness(self) -> i32 {
        match self {
            PriorityHint::Lowest => 19,
            PriorityHint::Low => 10,
            PriorityHint::Normal => 0,
            PriorityHint::High => -5,
            PriorityHint::Highest => -10,
        }
    }

    /// Apply the hint to the calling thread.
    ///
    /// Returns `false` when the platform has no per-thread priority or the
    /// process lacks permission (raising priority usually needs
    /// `CAP_SYS_NICE`). Neither case is an error.
    pub fn apply_to_current_thread(self) -> bool {
        apply_niceness(self.niceness())
    }
}

impl fmt::Display for PriorityHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriorityHint::Lowest => "lowest",
            PriorityHint::Low => "low",
            PriorityHint::Normal => "normal",
            PriorityHint::High => "high",
            PriorityHint::Highest => "highest",
        };
        f.write_str(name)
    }
}

#[cfg(target_os = "linux")]
fn apply_niceness(nice: i32) -> bool {
    // On Linux the PRIO_PROCESS target may be a thread id, which scopes the
    // change to this thread only.
    let result = unsafe {
        let tid = libc::syscall(libc::SYS_gettid) as libc::id_t;
        libc::setpriority(libc::PRIO_PROCESS as _, tid, nice)
    };
    if result != 0 {
        tracing::debug!(
            thread = std::thread::current().name().unwrap_or("unknown"),
            nice,
            "could not apply priority hint: {}",
            std::io::Error::last_os_error()
        );
        return false;
    }
    true
}

#[cfg(not(target_os = "linux"))]
fn apply_niceness(nice: i32) -> bool {
    tracing::debug!(nice, "per-thread priority hints unsupported on this platform");
    false
}
