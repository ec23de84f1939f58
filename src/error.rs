use thiserror::Error;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The task queue stayed full for the whole submission wait budget.
    #[error("Task queue is full")]
    QueueFull,

    /// Extraction requested a type other than the one the task produced.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type the task actually produced.
        found: &'static str,
    },

    /// The task panicked while executing.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// The submission was rejected and the task never ran.
    #[error("Submission was rejected")]
    Rejected,

    /// `start` was called on a pool that is already running.
    #[error("Pool is already started")]
    AlreadyStarted,

    /// The pool has not been started.
    #[error("Pool is not running")]
    NotRunning,

    /// A configuration value was out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Shutdown expired before every worker deregistered.
    #[error("Shutdown timed out with workers still running")]
    ShutdownTimedOut,
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
