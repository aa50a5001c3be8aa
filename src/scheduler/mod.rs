//! Scheduling hints.
//!
//! Tasks run on plain OS threads; the only lever over the OS scheduler is the
//! advisory [`PriorityHint`] applied to each task thread when it starts.

pub mod priority;

pub use priority::PriorityHint;
