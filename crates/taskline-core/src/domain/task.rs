//! Task model: the canonical unit of work and its convenience shapes.

use std::fmt;
use std::sync::Arc;

use crate::ports::ExecutionContext;
use crate::queue::Continuation;

/// Value handed from one task to the next.
///
/// The engine never inspects it; it is recorded as the queue's last result
/// and forwarded to the next serial task or to a parent queue. Success and
/// failure are whatever the caller encodes in it.
pub type TaskValue = serde_json::Value;

type TaskBody = dyn Fn(Option<TaskValue>, Continuation) + Send + Sync + 'static;

/// One unit of queued work.
///
/// Every shape a caller can attach is normalized to the same signature:
/// `(previous result, continuation)`. The body must eventually consume the
/// continuation exactly once (`resume`, `done` or `retry`); a body that
/// drops it without doing so stalls its slot.
///
/// Cloning is cheap and shares the body. The queue clones a task when it
/// has to run it again (retry, reset).
///
/// # Shapes
/// - [`Task::action`]: fire-and-forget closure, resumes with no value.
/// - [`Task::new`]: result-aware closure with an explicit continuation.
/// - [`Task::queue`]: a whole queue run as one step.
#[derive(Clone)]
pub struct Task {
    body: Arc<TaskBody>,
    context: ExecutionContext,
    name: Option<Arc<str>>,
}

impl Task {
    /// Result-aware task: receives the previous result and the continuation.
    ///
    /// ```ignore
    /// let fetch = Task::new(|prev, next| {
    ///     let page = prev.and_then(|v| v.as_u64()).unwrap_or(0);
    ///     next.resume_with(page + 1);
    /// });
    /// ```
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Option<TaskValue>, Continuation) + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
            context: ExecutionContext::Inline,
            name: None,
        }
    }

    /// Fire-and-forget task: runs `action`, then resumes with no value.
    pub fn action<F>(action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(move |_, next| {
            action();
            next.done();
        })
    }

    /// Tag the task with the context it should run on.
    ///
    /// The tag is fixed at attach time; the queue forwards it to the
    /// executor when the task is dispatched.
    pub fn on(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Attach a name used in log output.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn invoke(&self, input: Option<TaskValue>, next: Continuation) {
        (self.body)(input, next)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
