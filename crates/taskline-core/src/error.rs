use thiserror::Error;

/// Contract violations reported by queue operations.
///
/// None of these are recoverable by retrying the same call: they mean the
/// caller used an operation the queue's current mode does not support.
/// The queue is left untouched when one of them is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("max_concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("{op}() is only allowed on serial queues (max_concurrency={max_concurrency})")]
    NotSerial {
        op: &'static str,
        max_concurrency: usize,
    },

    #[error("{0}() called while no task is in flight")]
    NoCurrentTask(&'static str),
}

/// Failures while setting up an [`Executor`](crate::ports::Executor).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("failed to spawn the foreground thread: {0}")]
    Spawn(#[from] std::io::Error),
}
