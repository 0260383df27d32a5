//! Queue run-state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run state of a queue.
///
/// State transitions:
/// - Idle -> Running (`run`)
/// - Running -> Paused (`pause`, `pause_and_reset_current_task`)
/// - Paused -> Running (`run`)
/// - Running | Paused -> Cancelling (`cancel`)
/// - Running | Cancelling -> Idle (drain: no task left, none active)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Not started, or fully drained. Dispatch re-entries are ignored.
    #[default]
    Idle,

    /// Pulling and dispatching tasks.
    Running,

    /// No new task starts; in-flight tasks still finish.
    Paused,

    /// Pending tasks and completions are discarded on the next dispatch
    /// entry; the queue returns to Idle once in-flight tasks finish.
    Cancelling,
}

impl QueueState {
    /// Has the queue been started and not yet drained?
    pub fn is_active(self) -> bool {
        !matches!(self, QueueState::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueState::Idle => "idle",
            QueueState::Running => "running",
            QueueState::Paused => "paused",
            QueueState::Cancelling => "cancelling",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
