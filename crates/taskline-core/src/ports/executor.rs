//! Executor port - where and when queued work actually runs.
//!
//! The queue engine never spawns threads or sleeps by itself. Every
//! asynchronous hop (running a tagged task, the parallel pull re-entry,
//! the delayed re-entry of a retry) is a request against this trait.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Named execution context a task is tagged with at attach time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// Run directly on whatever thread submits the job.
    #[default]
    Inline,

    /// The single foreground context (think "UI thread"): jobs run one at a
    /// time in submission order.
    Foreground,

    /// The shared background pool.
    Background,
}

impl ExecutionContext {
    /// Context to use when a job must not run on the submitting thread.
    ///
    /// Inline collapses to Background; the others are kept.
    pub fn detached(self) -> Self {
        match self {
            ExecutionContext::Inline => ExecutionContext::Background,
            other => other,
        }
    }
}

/// Executor runs jobs on a named context after an optional delay.
///
/// # Contract
/// - `job` runs exactly once, no earlier than `delay` from submission.
/// - `Inline` with a zero delay may run `job` before `submit` returns.
/// - No handle is returned and submitted jobs cannot be cancelled.
///
/// # Thread Safety
/// - `Send + Sync`: queues submit from whichever thread drives them.
pub trait Executor: Send + Sync {
    fn submit(&self, context: ExecutionContext, delay: Duration, job: Job);
}
