//! Completion registry: callbacks fired once when a queue drains.

/// Zero-argument callback registered through `run_then`.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// FIFO list of pending completions.
///
/// The queue owns the registry and only touches it under its lock. Flushing
/// is split in two so the callbacks never run under that lock: [`take`]
/// empties the registry atomically, the returned batch is invoked after the
/// lock is released.
///
/// [`take`]: CompletionRegistry::take
#[derive(Default)]
pub(crate) struct CompletionRegistry {
    pending: Vec<Completion>,
}

impl CompletionRegistry {
    pub(crate) fn push(&mut self, completion: Completion) {
        self.pending.push(completion);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending completion without running it. Returns how many
    /// were dropped.
    pub(crate) fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Move the pending batch out, leaving the registry empty.
    pub(crate) fn take(&mut self) -> CompletionBatch {
        CompletionBatch(std::mem::take(&mut self.pending))
    }
}

/// A batch of completions detached from the registry.
pub(crate) struct CompletionBatch(Vec<Completion>);

impl CompletionBatch {
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Invoke every completion in registration order.
    pub(crate) fn fire(self) {
        for completion in self.0 {
            completion();
        }
    }
}
