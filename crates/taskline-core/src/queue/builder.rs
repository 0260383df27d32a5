//! QueueBuilder - assemble a queue and validate it up front.

use std::sync::Arc;
use std::time::Duration;

use super::{Queue, QueueConfig};
use crate::domain::Task;
use crate::error::QueueError;
use crate::ports::Executor;

/// Builds a [`Queue`] from an executor, a configuration and initial tasks.
///
/// # Usage
/// ```ignore
/// let queue = Queue::builder(executor)
///     .max_concurrency(4)
///     .label("thumbnails")
///     .task(Task::action(resize).on(ExecutionContext::Background))
///     .build()?;
/// ```
///
/// # Fail-fast
/// - `build()` validates the configuration and returns
///   `QueueError::InvalidConcurrency` instead of building a queue that could
///   never dispatch.
pub struct QueueBuilder {
    executor: Arc<dyn Executor>,
    config: QueueConfig,
    tasks: Vec<Task>,
}

impl QueueBuilder {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            config: QueueConfig::default(),
            tasks: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    pub fn parallel_pull_delay(mut self, delay: Duration) -> Self {
        self.config.parallel_pull_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Append an initial task.
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Append several initial tasks, keeping their order.
    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn build(self) -> Result<Queue, QueueError> {
        let queue = Queue::with_config(self.executor, self.config)?;
        queue.extend(self.tasks);
        Ok(queue)
    }
}
