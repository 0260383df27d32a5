//! The dispatch loop.
//!
//! Every way work moves forward goes through [`Queue::enter`]: `run`, each
//! continuation, the parallel pull re-entry, and the delayed re-entry of a
//! retry. One entry runs one [`Queue::step`]:
//!
//! 1. Cancelling: discard pending tasks and completions.
//! 2. Active count at the bound: stop, a finishing task re-enters.
//! 3. Record the entry value as the last result.
//! 4. Paused: stop.
//! 5. Pop the front task (under the lock) and count it as active.
//! 6. No task and nothing active: fire the completions, go idle.
//! 7. Task: serial runs it right here with the entry value; parallel hands
//!    it to the executor and schedules another entry to keep pulling.
//!
//! The lock is held for steps 1-6 only. Tasks, completions and executor
//! submissions always run with it released.
//!
//! A continuation that fires while its queue is already inside `enter` on
//! some thread (typically synchronously, from an inline task) does not
//! recurse: its entry is parked in the backlog and the running loop picks
//! it up. Long chains of inline tasks therefore run in constant stack.

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::completion::CompletionBatch;
use super::{Core, InFlight, Queue, QueueState, Ticket};
use crate::domain::{Task, TaskValue};
use crate::error::QueueError;
use crate::ports::ExecutionContext;

use super::continuation::Continuation;

/// What a single step decided, acted upon after the lock is released.
enum Pulled {
    Nothing,
    Drained(CompletionBatch),
    Dispatch {
        task: Task,
        ticket: Ticket,
        input: Option<TaskValue>,
        parallel: bool,
    },
}

/// Resets the pump flag if a task body panics inside the loop, so the
/// queue is not left believing someone else is dispatching.
struct PumpGuard<'a> {
    queue: &'a Queue,
}

impl Drop for PumpGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut core = self.queue.lock();
            core.pumping = false;
            core.backlog.clear();
        }
    }
}

/// Move the serial in-flight task back to the front of the list and revoke
/// its ticket. `ticket` restricts the operation to that dispatch.
pub(super) fn requeue_in_flight(
    core: &mut Core,
    ticket: Option<Ticket>,
    op: &'static str,
) -> Result<Ticket, QueueError> {
    if core.max_concurrency != 1 {
        return Err(QueueError::NotSerial {
            op,
            max_concurrency: core.max_concurrency,
        });
    }
    let matches = match (&core.current, ticket) {
        (Some(current), Some(ticket)) => current.ticket == ticket,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if !matches {
        return Err(QueueError::NoCurrentTask(op));
    }
    let Some(InFlight { ticket, task }) = core.current.take() else {
        return Err(QueueError::NoCurrentTask(op));
    };
    core.live.remove(&ticket);
    core.tasks.push_front(task);
    Ok(ticket)
}

impl Queue {
    /// Enter the dispatch loop with `value` as the produced result.
    pub(crate) fn enter(&self, value: Option<TaskValue>) {
        {
            let mut core = self.lock();
            if core.pumping {
                core.backlog.push_back(value);
                return;
            }
            core.pumping = true;
        }

        let _guard = PumpGuard { queue: self };
        let mut next = Some(value);
        while let Some(value) = next {
            self.step(value);
            let mut core = self.lock();
            next = core.backlog.pop_front();
            if next.is_none() {
                core.pumping = false;
            }
        }
    }

    fn step(&self, value: Option<TaskValue>) {
        let pulled = {
            let mut core = self.lock();
            self.pull(&mut core, value)
        };

        match pulled {
            Pulled::Nothing => {}
            Pulled::Drained(completions) => {
                debug!(queue = %self.id(), completions = completions.len(), "drained");
                completions.fire();
            }
            Pulled::Dispatch {
                task,
                ticket,
                input,
                parallel,
            } => self.dispatch(task, ticket, input, parallel),
        }
    }

    fn pull(&self, core: &mut Core, value: Option<TaskValue>) -> Pulled {
        if !core.state.is_active() {
            // Late pull re-entry from a parallel run that already drained.
            trace!(queue = %self.id(), "entry while idle ignored");
            return Pulled::Nothing;
        }

        if core.state == QueueState::Cancelling {
            let tasks = core.tasks.len();
            core.tasks.clear();
            let completions = core.completions.discard();
            if tasks > 0 || completions > 0 {
                debug!(queue = %self.id(), tasks, completions, "cancel discarded pending work");
            }
        }

        if core.active >= core.max_concurrency {
            return Pulled::Nothing;
        }

        core.last_result = value.clone();

        if core.state == QueueState::Paused {
            return Pulled::Nothing;
        }

        let Some(task) = core.tasks.pop_front() else {
            if core.active > 0 {
                return Pulled::Nothing;
            }
            core.state = QueueState::Idle;
            core.current = None;
            return Pulled::Drained(core.completions.take());
        };

        core.active += 1;
        let ticket = core.next_ticket;
        core.next_ticket += 1;
        core.live.insert(ticket);
        core.current = Some(InFlight {
            ticket,
            task: task.clone(),
        });

        let parallel = core.max_concurrency > 1;
        Pulled::Dispatch {
            task,
            ticket,
            input: if parallel { None } else { value },
            parallel,
        }
    }

    fn dispatch(&self, task: Task, ticket: Ticket, input: Option<TaskValue>, parallel: bool) {
        trace!(
            queue = %self.id(),
            ticket,
            task = task.name().unwrap_or("-"),
            context = ?task.context(),
            parallel,
            "dispatch"
        );
        let next = Continuation::new(self.downgrade(), ticket);
        let executor = &self.inner.executor;

        if parallel {
            let weak = self.downgrade();
            executor.submit(
                ExecutionContext::Background,
                self.inner.pull_delay,
                Box::new(move || {
                    if let Some(queue) = weak.upgrade() {
                        queue.enter(None);
                    }
                }),
            );
            let context = task.context().detached();
            executor.submit(
                context,
                Duration::ZERO,
                Box::new(move || task.invoke(input, next)),
            );
            return;
        }

        match task.context() {
            ExecutionContext::Inline => task.invoke(input, next),
            context => executor.submit(
                context,
                Duration::ZERO,
                Box::new(move || task.invoke(input, next)),
            ),
        }
    }

    /// Continuation target: release the slot and re-enter with `value`.
    pub(crate) fn finish(&self, ticket: Ticket, value: Option<TaskValue>) {
        {
            let mut core = self.lock();
            if !core.live.remove(&ticket) {
                warn!(queue = %self.id(), ticket, "continuation of a retried or reset dispatch ignored");
                return;
            }
            core.active = core.active.saturating_sub(1);
            if core.current.as_ref().is_some_and(|c| c.ticket == ticket) {
                core.current = None;
            }
        }
        self.enter(value);
    }

    /// Requeue the in-flight task and schedule the re-entry after `delay`.
    ///
    /// The slot stays occupied until the delay has passed, so nothing else
    /// starts in between.
    pub(crate) fn retry_dispatch(
        &self,
        ticket: Option<Ticket>,
        delay: Duration,
        op: &'static str,
    ) -> Result<(), QueueError> {
        {
            let mut core = self.lock();
            let ticket = requeue_in_flight(&mut core, ticket, op)?;
            debug!(queue = %self.id(), ticket, delay_ms = delay.as_millis() as u64, "retry scheduled");
        }

        let weak = self.downgrade();
        self.inner.executor.submit(
            ExecutionContext::Background,
            delay,
            Box::new(move || {
                if let Some(queue) = weak.upgrade() {
                    queue.reenter_after_retry();
                }
            }),
        );
        Ok(())
    }

    fn reenter_after_retry(&self) {
        let value = {
            let mut core = self.lock();
            core.active = core.active.saturating_sub(1);
            core.last_result.clone()
        };
        self.enter(value);
    }
}
