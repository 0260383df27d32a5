//! taskline-core
//!
//! In-process task sequencing: an ordered queue of small units of work run
//! one after another or up to a concurrency bound, each on a chosen
//! execution context, with pause/resume, skip, delayed retry, cancellation,
//! drain completions and queues nested inside queues.
//!
//! # Modules
//! - **domain**: tasks, the values passed between them, queue ids
//! - **ports**: the [`Executor`](ports::Executor) abstraction tasks run on
//! - **impls**: a tokio-backed executor and a manual one for tests
//! - **queue**: the queue itself, its configuration and continuations
//! - **observability**: status snapshots
//! - **error**: error types

pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use domain::{QueueId, Task, TaskValue};
pub use error::{ExecutorError, QueueError};
pub use impls::{ManualExecutor, TokioExecutor};
pub use observability::{QueueMode, QueueStatus};
pub use ports::{ExecutionContext, Executor};
pub use queue::{Continuation, Queue, QueueBuilder, QueueConfig, QueueState, RetryRejected, WeakQueue};
