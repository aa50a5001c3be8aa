use crate::executor::panic_handler::TaskFault;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to spawn execution context: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("interrupted while waiting")]
    Interrupted,

    #[error("task fault: {0}")]
    TaskFault(TaskFault),

    #[error("task {task} did not terminate within {waited:?}")]
    JoinTimeout { task: String, waited: Duration },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    pub fn join_timeout<S: Into<String>>(task: S, waited: Duration) -> Self {
        Error::JoinTimeout {
            task: task.into(),
            waited,
        }
    }

    /// True for the expected cancellation path, as opposed to a real failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}
