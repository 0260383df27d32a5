//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Tunables for a single queue.
///
/// Every field has a default, so a partial JSON document is enough:
/// `{"max_concurrency": 4}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on tasks in flight. 1 means serial.
    pub max_concurrency: usize,

    /// Delay of the re-entry a parallel queue schedules after each pull, in
    /// milliseconds. Keeps pulling up to the bound without recursing.
    pub parallel_pull_delay_ms: u64,

    /// Optional name shown in diagnostics next to the queue id.
    pub label: Option<String>,
}

impl QueueConfig {
    pub const DEFAULT_PARALLEL_PULL_DELAY_MS: u64 = 1;

    /// Serial queue with default tunables.
    pub fn serial() -> Self {
        Self::default()
    }

    /// Bounded-parallel queue with at most `max_concurrency` tasks in flight.
    pub fn parallel(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn parallel_pull_delay(&self) -> Duration {
        Duration::from_millis(self.parallel_pull_delay_ms)
    }

    /// Fail fast on values the engine cannot honor.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_concurrency < 1 {
            return Err(QueueError::InvalidConcurrency(self.max_concurrency));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            parallel_pull_delay_ms: Self::DEFAULT_PARALLEL_PULL_DELAY_MS,
            label: None,
        }
    }
}
