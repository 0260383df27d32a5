//! TokioExecutor - runs queue work on a tokio runtime.
//!
//! - Inline: the submitting thread (after the delay: the blocking pool).
//! - Background: tokio's blocking pool, since task bodies are plain
//!   closures that may block.
//! - Foreground: one dedicated OS thread draining a channel, so foreground
//!   jobs never overlap and keep their submission order.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ExecutorError;
use crate::ports::{ExecutionContext, Executor, Job};

const FOREGROUND_THREAD: &str = "taskline-foreground";

/// Executor backed by a tokio runtime handle.
///
/// # Usage
/// ```ignore
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let executor = Arc::new(TokioExecutor::current()?);
///     let queue = Queue::new(executor);
///     // ...
/// }
/// ```
///
/// Dropping the executor closes the foreground channel; the foreground
/// thread exits after finishing the jobs already queued.
pub struct TokioExecutor {
    handle: Handle,
    foreground: mpsc::UnboundedSender<Job>,
}

impl TokioExecutor {
    /// Create an executor on the given runtime and start the foreground
    /// thread.
    pub fn new(handle: Handle) -> Result<Self, ExecutorError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        std::thread::Builder::new()
            .name(FOREGROUND_THREAD.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                debug!("foreground context closed");
            })?;
        Ok(Self {
            handle,
            foreground: tx,
        })
    }

    /// Create an executor on the runtime the caller is running in.
    pub fn current() -> Result<Self, ExecutorError> {
        Self::new(Handle::try_current()?)
    }

    /// Name of the thread foreground jobs run on.
    pub fn foreground_thread_name() -> &'static str {
        FOREGROUND_THREAD
    }
}

fn send_foreground(tx: &mpsc::UnboundedSender<Job>, job: Job) {
    if tx.send(job).is_err() {
        warn!("foreground context is closed; job dropped");
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, context: ExecutionContext, delay: Duration, job: Job) {
        if delay.is_zero() {
            match context {
                ExecutionContext::Inline => job(),
                ExecutionContext::Foreground => send_foreground(&self.foreground, job),
                ExecutionContext::Background => {
                    self.handle.spawn_blocking(job);
                }
            }
            return;
        }

        let foreground = self.foreground.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            match context {
                ExecutionContext::Foreground => send_foreground(&foreground, job),
                ExecutionContext::Inline | ExecutionContext::Background => {
                    tokio::task::spawn_blocking(job);
                }
            }
        });
    }
}
