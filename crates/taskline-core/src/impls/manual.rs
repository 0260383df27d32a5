//! ManualExecutor - deterministic executor with a virtual clock.
//!
//! Nothing runs on its own: tests drive time explicitly with
//! [`ManualExecutor::run_next`], [`ManualExecutor::advance`] or
//! [`ManualExecutor::run_until_idle`]. Delays are virtual, so a retry with a
//! ten second delay completes instantly while `now()` still reports the ten
//! seconds as elapsed.

use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::ports::{ExecutionContext, Executor, Job};

/// A submission as the executor saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub context: ExecutionContext,
    pub delay: Duration,
    /// Virtual time at which the job was submitted.
    pub submitted_at: Duration,
}

/// Scheduled job entry for the min-heap.
struct Scheduled {
    due: Duration,
    seq: u64,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering: earliest due first, then submission order.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    scheduled: BinaryHeap<Scheduled>,
    submissions: Vec<Submission>,
}

/// Executor for tests: single-threaded, virtual time, fully deterministic.
///
/// - `Inline` jobs with a zero delay run before `submit` returns.
/// - Every other job is parked until the clock reaches its due time. Jobs
///   due at the same instant run in submission order.
/// - Jobs always run with the internal lock released, so they may submit
///   more jobs.
#[derive(Default)]
pub struct ManualExecutor {
    state: Mutex<ManualState>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of parked jobs.
    pub fn pending(&self) -> usize {
        self.lock().scheduled.len()
    }

    /// Every submission so far, in order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    /// Run the earliest parked job, moving the clock forward to its due
    /// time. Returns `false` when nothing is parked.
    pub fn run_next(&self) -> bool {
        let job = {
            let mut state = self.lock();
            let Some(entry) = state.scheduled.pop() else {
                return false;
            };
            if entry.due > state.now {
                state.now = entry.due;
            }
            entry.job
        };
        job();
        true
    }

    /// Run jobs due within `by` from now, then set the clock to `now + by`.
    /// Returns the number of jobs run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        loop {
            let job = {
                let mut state = self.lock();
                match state.scheduled.peek() {
                    Some(entry) if entry.due <= target => {}
                    _ => break,
                }
                let Some(entry) = state.scheduled.pop() else {
                    break;
                };
                if entry.due > state.now {
                    state.now = entry.due;
                }
                entry.job
            };
            job();
            ran += 1;
        }
        let mut state = self.lock();
        if target > state.now {
            state.now = target;
        }
        ran
    }

    /// Run parked jobs until none are left. Returns the number of jobs run.
    ///
    /// A job that keeps rescheduling itself makes this loop forever; tests
    /// with unbounded retries should use [`ManualExecutor::advance`].
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn submit(&self, context: ExecutionContext, delay: Duration, job: Job) {
        let run_now = {
            let mut state = self.lock();
            let submitted_at = state.now;
            state.submissions.push(Submission {
                context,
                delay,
                submitted_at,
            });
            if context == ExecutionContext::Inline && delay.is_zero() {
                Some(job)
            } else {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.scheduled.push(Scheduled {
                    due: submitted_at + delay,
                    seq,
                    job,
                });
                None
            }
        };
        if let Some(job) = run_now {
            job();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Job) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |label: &'static str| -> Job {
                let log = log.clone();
                Box::new(move || log.lock().unwrap().push(label))
            }
        };
        (log, make)
    }

    #[test]
    fn inline_zero_delay_runs_immediately() {
        let exec = ManualExecutor::new();
        let (log, job) = recorder();
        exec.submit(ExecutionContext::Inline, Duration::ZERO, job("now"));
        assert_eq!(*log.lock().unwrap(), vec!["now"]);
        assert_eq!(exec.pending(), 0);
    }

    #[test]
    fn parked_jobs_run_by_due_time_then_submission_order() {
        let exec = ManualExecutor::new();
        let (log, job) = recorder();
        exec.submit(ExecutionContext::Background, Duration::from_millis(20), job("late"));
        exec.submit(ExecutionContext::Background, Duration::ZERO, job("first"));
        exec.submit(ExecutionContext::Foreground, Duration::ZERO, job("second"));
        exec.submit(ExecutionContext::Inline, Duration::from_millis(5), job("delayed-inline"));

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(exec.run_until_idle(), 4);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "second", "delayed-inline", "late"]
        );
        assert_eq!(exec.now(), Duration::from_millis(20));
    }

    #[test]
    fn advance_only_runs_due_jobs() {
        let exec = ManualExecutor::new();
        let (log, job) = recorder();
        exec.submit(ExecutionContext::Background, Duration::from_secs(1), job("a"));
        exec.submit(ExecutionContext::Background, Duration::from_secs(3), job("b"));

        assert_eq!(exec.advance(Duration::from_secs(2)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        assert_eq!(exec.now(), Duration::from_secs(2));
        assert_eq!(exec.pending(), 1);
    }

    #[test]
    fn jobs_may_submit_more_jobs() {
        let exec = Arc::new(ManualExecutor::new());
        let (log, job) = recorder();
        let inner = job("inner");
        let chained = {
            let exec = exec.clone();
            let log = log.clone();
            Box::new(move || {
                log.lock().unwrap().push("outer");
                exec.submit(ExecutionContext::Background, Duration::from_millis(1), inner);
            })
        };
        exec.submit(ExecutionContext::Background, Duration::ZERO, chained);

        assert_eq!(exec.run_until_idle(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
        let subs = exec.submissions();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].submitted_at, Duration::ZERO);
    }
}
