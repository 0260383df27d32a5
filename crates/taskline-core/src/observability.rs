//! Status views of a queue, for logs and diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::QueueId;
use crate::queue::QueueState;

/// Serial when at most one task runs at a time, parallel otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    Serial,
    Parallel,
}

impl QueueMode {
    pub fn for_concurrency(max_concurrency: usize) -> Self {
        if max_concurrency > 1 {
            QueueMode::Parallel
        } else {
            QueueMode::Serial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueMode::Serial => "serial",
            QueueMode::Parallel => "parallel",
        }
    }
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a queue.
///
/// Displays as a one-line descriptor:
/// `[queue-<id>] mode=serial state=running remaining=3 active=1`
/// with `label=<label>` after the id when the queue has one, and
/// `completions=<n>` at the end while completions are pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub id: QueueId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub mode: QueueMode,
    pub state: QueueState,
    pub remaining: usize,
    pub active: usize,
    pub max_concurrency: usize,
    pub pending_completions: usize,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.id)?;
        if let Some(label) = &self.label {
            write!(f, " label={label}")?;
        }
        write!(
            f,
            " mode={} state={} remaining={} active={}",
            self.mode, self.state, self.remaining, self.active
        )?;
        if self.mode == QueueMode::Parallel {
            write!(f, "/{}", self.max_concurrency)?;
        }
        if self.pending_completions > 0 {
            write!(f, " completions={}", self.pending_completions)?;
        }
        Ok(())
    }
}
