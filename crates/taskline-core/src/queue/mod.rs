//! Queue module: the scheduling engine and its public surface.
//!
//! A [`Queue`] owns an ordered list of not-yet-started [`Task`]s and a list
//! of pending completions. `run` starts a dispatch loop that pulls tasks in
//! FIFO order, at most `max_concurrency` at a time, until the list is empty
//! and nothing is in flight. The pending completions then fire once and the
//! queue goes back to idle, ready to be run again.
//!
//! ```ignore
//! let queue = Queue::new(executor);
//! queue.add_action(ExecutionContext::Background, || compress());
//! queue.add_step(ExecutionContext::Inline, |prev, next| next.resume(prev));
//! queue.run_then(|| println!("all done"));
//! ```

mod builder;
mod completion;
mod compose;
mod config;
mod continuation;
mod dispatch;
mod state;


pub use builder::QueueBuilder;
pub use completion::Completion;
pub use config::QueueConfig;
pub use continuation::{Continuation, RetryRejected};
pub use state::QueueState;

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::debug;

use crate::domain::{QueueId, Task, TaskValue};
use crate::error::QueueError;
use crate::observability::{QueueMode, QueueStatus};
use crate::ports::{ExecutionContext, Executor};

use completion::CompletionRegistry;

/// Identifies one dispatch of one task.
pub(crate) type Ticket = u64;

/// The task currently in flight (serial queues) with its dispatch ticket.
struct InFlight {
    ticket: Ticket,
    task: Task,
}

/// Mutable queue state. Only touched under `Inner::core`.
struct Core {
    tasks: VecDeque<Task>,
    completions: CompletionRegistry,
    state: QueueState,
    active: usize,
    max_concurrency: usize,
    current: Option<InFlight>,
    /// Tickets whose continuation is still allowed to report.
    live: HashSet<Ticket>,
    next_ticket: Ticket,
    last_result: Option<TaskValue>,
    /// A thread is inside the dispatch loop; other entries go to `backlog`.
    pumping: bool,
    backlog: VecDeque<Option<TaskValue>>,
}

impl Core {
    fn new(max_concurrency: usize) -> Self {
        Self {
            tasks: VecDeque::new(),
            completions: CompletionRegistry::default(),
            state: QueueState::Idle,
            active: 0,
            max_concurrency,
            current: None,
            live: HashSet::new(),
            next_ticket: 0,
            last_result: None,
            pumping: false,
            backlog: VecDeque::new(),
        }
    }

    fn mode(&self) -> QueueMode {
        QueueMode::for_concurrency(self.max_concurrency)
    }
}

struct Inner {
    id: QueueId,
    label: Option<String>,
    executor: Arc<dyn Executor>,
    pull_delay: Duration,
    core: Mutex<Core>,
}

/// Handle to a task queue.
///
/// Cloning is cheap and yields another handle to the same queue. The queue
/// is dropped with its last handle; continuations and scheduled re-entries
/// only hold [`WeakQueue`]s.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`Queue`].
///
/// Give this to a task that needs to call back into its own queue, so the
/// queue (which owns the task) is not kept alive by the task.
#[derive(Clone)]
pub struct WeakQueue(Weak<Inner>);

impl WeakQueue {
    pub fn upgrade(&self) -> Option<Queue> {
        self.0.upgrade().map(|inner| Queue { inner })
    }
}

impl fmt::Debug for WeakQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakQueue")
    }
}

impl Queue {
    /// Serial queue with default configuration.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::from_config(executor, QueueConfig::default())
    }

    /// Queue from an explicit configuration, validated first.
    pub fn with_config(
        executor: Arc<dyn Executor>,
        config: QueueConfig,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self::from_config(executor, config))
    }

    /// Start a [`QueueBuilder`].
    pub fn builder(executor: Arc<dyn Executor>) -> QueueBuilder {
        QueueBuilder::new(executor)
    }

    fn from_config(executor: Arc<dyn Executor>, config: QueueConfig) -> Self {
        let pull_delay = config.parallel_pull_delay();
        Self {
            inner: Arc::new(Inner {
                id: QueueId::generate(),
                label: config.label,
                executor,
                pull_delay,
                core: Mutex::new(Core::new(config.max_concurrency)),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.inner
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> QueueId {
        self.inner.id
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    pub fn downgrade(&self) -> WeakQueue {
        WeakQueue(Arc::downgrade(&self.inner))
    }

    // ── attaching work ──────────────────────────────────────────────────

    /// Append a task. Allowed in any state, including while running.
    pub fn add(&self, task: Task) {
        self.lock().tasks.push_back(task);
    }

    /// Append several tasks, keeping their order.
    pub fn extend(&self, tasks: impl IntoIterator<Item = Task>) {
        self.lock().tasks.extend(tasks);
    }

    /// Append a fire-and-forget action to run on `context`.
    pub fn add_action<F>(&self, context: ExecutionContext, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add(Task::action(action).on(context));
    }

    /// Append a result-aware step to run on `context`.
    pub fn add_step<F>(&self, context: ExecutionContext, step: F)
    where
        F: Fn(Option<TaskValue>, Continuation) + Send + Sync + 'static,
    {
        self.add(Task::new(step).on(context));
    }

    /// Append another queue as a single step; see [`Task::queue`].
    pub fn add_queue(&self, child: &Queue) {
        self.add(Task::queue(child));
    }

    // ── running ─────────────────────────────────────────────────────────

    /// Start the queue, or resume it if paused. No-op while running.
    pub fn run(&self) {
        self.start(None);
    }

    /// Like [`Queue::run`], and register `completion` to fire once the
    /// queue drains. Registering on a running queue adds to the pending
    /// batch; it never restarts the queue.
    pub fn run_then<F>(&self, completion: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.start(Some(Box::new(completion)));
    }

    /// Call [`Queue::run`] from `context` instead of the current thread.
    pub fn run_on(&self, context: ExecutionContext) {
        let queue = self.clone();
        self.inner
            .executor
            .submit(context, Duration::ZERO, Box::new(move || queue.run()));
    }

    fn start(&self, completion: Option<Completion>) {
        let entry = {
            let mut core = self.lock();
            if let Some(completion) = completion {
                core.completions.push(completion);
            }
            match core.state {
                QueueState::Idle => {
                    core.state = QueueState::Running;
                    debug!(queue = %self.id(), remaining = core.tasks.len(), mode = %core.mode(), "start");
                    Some(None)
                }
                QueueState::Paused => {
                    core.state = QueueState::Running;
                    debug!(queue = %self.id(), remaining = core.tasks.len(), "resume");
                    Some(core.last_result.clone())
                }
                QueueState::Running | QueueState::Cancelling => None,
            }
        };
        if let Some(value) = entry {
            self.enter(value);
        }
    }

    // ── control ─────────────────────────────────────────────────────────

    /// Stop pulling new tasks. In-flight tasks still finish; `run` resumes.
    /// No-op unless running.
    pub fn pause(&self) {
        let mut core = self.lock();
        if core.state == QueueState::Running {
            core.state = QueueState::Paused;
            debug!(queue = %self.id(), active = core.active, "pause");
        }
    }

    /// Discard every pending task and completion.
    ///
    /// In-flight tasks are not interrupted; they finish and the queue then
    /// returns to idle without firing the discarded completions. On an idle
    /// queue the pending lists are cleared right away.
    pub fn cancel(&self) {
        let kick = {
            let mut core = self.lock();
            match core.state {
                QueueState::Idle => {
                    let tasks = core.tasks.len();
                    core.tasks.clear();
                    let completions = core.completions.discard();
                    debug!(queue = %self.id(), tasks, completions, "cancel while idle");
                    None
                }
                QueueState::Cancelling => None,
                QueueState::Running | QueueState::Paused => {
                    core.state = QueueState::Cancelling;
                    debug!(queue = %self.id(), active = core.active, "cancel requested");
                    Some(core.last_result.clone())
                }
            }
        };
        if let Some(value) = kick {
            self.enter(value);
        }
    }

    /// Remove the next not-yet-started task without running it.
    pub fn skip(&self) {
        let mut core = self.lock();
        if let Some(task) = core.tasks.pop_front() {
            debug!(queue = %self.id(), task = task.name().unwrap_or("-"), remaining = core.tasks.len(), "skip");
        }
    }

    /// Remove every not-yet-started task. In-flight tasks are unaffected.
    pub fn remove_all(&self) {
        let mut core = self.lock();
        let removed = core.tasks.len();
        core.tasks.clear();
        debug!(queue = %self.id(), removed, "remove all");
    }

    /// Put the task in flight back at the front and pause the queue.
    ///
    /// Serial queues only. The task starts over from scratch on the next
    /// `run`; whatever its interrupted dispatch reports later is ignored.
    pub fn pause_and_reset_current_task(&self) -> Result<(), QueueError> {
        let kick = {
            let mut core = self.lock();
            let ticket = dispatch::requeue_in_flight(
                &mut core,
                None,
                "pause_and_reset_current_task",
            )?;
            core.active = core.active.saturating_sub(1);
            debug!(queue = %self.id(), ticket, "pause and reset current task");
            match core.state {
                QueueState::Running => {
                    core.state = QueueState::Paused;
                    None
                }
                // Nothing else would enter the loop to finish the cancel.
                QueueState::Cancelling => Some(core.last_result.clone()),
                QueueState::Paused | QueueState::Idle => None,
            }
        };
        if let Some(value) = kick {
            self.enter(value);
        }
        Ok(())
    }

    /// Put the task in flight back at the front and run it again after
    /// `delay`, with the queue's last result as input.
    ///
    /// Serial queues only. Meant to be called by the task itself, which
    /// then must not resume its continuation (see [`Continuation::retry`]
    /// for the variant that enforces this). The caller is responsible for
    /// limiting the number of retries.
    pub fn retry(&self, delay: Duration) -> Result<(), QueueError> {
        self.retry_dispatch(None, delay, "retry")
    }

    /// Change the concurrency bound.
    ///
    /// Takes effect at the next dispatch entry. Tasks already in flight are
    /// never interrupted: after lowering the bound, no new task starts until
    /// the active count drops below it.
    pub fn set_max_concurrency(&self, max_concurrency: usize) -> Result<(), QueueError> {
        if max_concurrency < 1 {
            return Err(QueueError::InvalidConcurrency(max_concurrency));
        }
        let mut core = self.lock();
        if core.max_concurrency != max_concurrency {
            debug!(queue = %self.id(), from = core.max_concurrency, to = max_concurrency, "max concurrency changed");
            core.max_concurrency = max_concurrency;
        }
        Ok(())
    }

    // ── observability ───────────────────────────────────────────────────

    /// Number of not-yet-started tasks.
    pub fn remaining(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Number of tasks currently in flight.
    pub fn active_count(&self) -> usize {
        self.lock().active
    }

    pub fn pending_completions(&self) -> usize {
        self.lock().completions.len()
    }

    pub fn max_concurrency(&self) -> usize {
        self.lock().max_concurrency
    }

    /// Last value recorded by the dispatch loop.
    pub fn last_result(&self) -> Option<TaskValue> {
        self.lock().last_result.clone()
    }

    pub fn state(&self) -> QueueState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == QueueState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == QueueState::Paused
    }

    /// Point-in-time snapshot for diagnostics.
    pub fn status(&self) -> QueueStatus {
        let core = self.lock();
        QueueStatus {
            id: self.inner.id,
            label: self.inner.label.clone(),
            mode: core.mode(),
            state: core.state,
            remaining: core.tasks.len(),
            active: core.active,
            max_concurrency: core.max_concurrency,
            pending_completions: core.completions.len(),
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.status(), f)
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Queue").field(&self.status()).finish()
    }
}
