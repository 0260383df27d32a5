//! Sub-queue adapter: a whole queue as one task of another queue.

use super::Queue;
use crate::domain::Task;

impl Task {
    /// Wrap `child` so it runs as a single step of a parent queue.
    ///
    /// Running the step starts `child` (or joins it if already running)
    /// and resumes with the child's last result once it drains. The parent
    /// does not move past the step before that. The child keeps all of its
    /// own semantics: pausing it pauses the parent at this step, and
    /// cancelling it discards the completion the step waits for, so the
    /// parent stays on this step.
    pub fn queue(child: &Queue) -> Self {
        let name = match child.label() {
            Some(label) => format!("subqueue {label}"),
            None => format!("subqueue {}", child.id()),
        };
        let child = child.clone();
        Task::new(move |_, next| {
            let weak = child.downgrade();
            child.run_then(move || {
                let result = weak.upgrade().and_then(|queue| queue.last_result());
                next.resume(result);
            });
        })
        .named(name)
    }
}

impl From<&Queue> for Task {
    fn from(child: &Queue) -> Self {
        Task::queue(child)
    }
}
