//! Continuation: the token a task consumes to hand control back.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use super::{Ticket, WeakQueue};
use crate::domain::TaskValue;
use crate::error::QueueError;

/// Handed to every task invocation; consuming it reports the task as done.
///
/// The continuation is tied to one dispatch of one task. Consuming methods
/// take `self`, so a single invocation cannot report twice. If the dispatch
/// was superseded in the meantime (the task was retried or reset), resuming
/// is ignored.
///
/// It only holds a weak handle to its queue: a pending continuation never
/// keeps a dropped queue alive.
pub struct Continuation {
    queue: WeakQueue,
    ticket: Ticket,
}

impl Continuation {
    pub(crate) fn new(queue: WeakQueue, ticket: Ticket) -> Self {
        Self { queue, ticket }
    }

    /// Report completion with an optional result.
    ///
    /// Safe to call from any thread. In a serial queue this is what starts
    /// the next task.
    pub fn resume(self, next: Option<TaskValue>) {
        match self.queue.upgrade() {
            Some(queue) => queue.finish(self.ticket, next),
            None => trace!(ticket = self.ticket, "queue dropped before continuation"),
        }
    }

    /// Report completion with a value.
    pub fn resume_with(self, value: impl Into<TaskValue>) {
        self.resume(Some(value.into()))
    }

    /// Report completion without a value.
    pub fn done(self) {
        self.resume(None)
    }

    /// Put this task back at the front of its queue and run it again after
    /// `delay`, with the queue's last result as input.
    ///
    /// Serial queues only. On rejection the continuation is handed back
    /// inside the error so the task can still resume.
    ///
    /// ```ignore
    /// Task::new(move |_, next| {
    ///     if !ready() {
    ///         if let Err(rejected) = next.retry(Duration::from_secs(1)) {
    ///             rejected.into_continuation().done();
    ///         }
    ///         return;
    ///     }
    ///     next.done();
    /// })
    /// ```
    pub fn retry(self, delay: Duration) -> Result<(), RetryRejected> {
        let Some(queue) = self.queue.upgrade() else {
            trace!(ticket = self.ticket, "queue dropped before retry");
            return Ok(());
        };
        match queue.retry_dispatch(Some(self.ticket), delay, "retry") {
            Ok(()) => Ok(()),
            Err(error) => Err(RetryRejected {
                error,
                continuation: self,
            }),
        }
    }

    /// Weak handle to the queue running this task.
    pub fn queue(&self) -> WeakQueue {
        self.queue.clone()
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

/// A rejected [`Continuation::retry`], carrying the continuation back.
#[derive(Debug, Error)]
#[error("retry rejected: {error}")]
pub struct RetryRejected {
    pub error: QueueError,
    pub continuation: Continuation,
}

impl RetryRejected {
    pub fn into_continuation(self) -> Continuation {
        self.continuation
    }
}
