//! Impls - executor implementations.
//!
//! # Included
//! - **TokioExecutor**: real threads and timers on a tokio runtime
//! - **ManualExecutor**: virtual clock, deterministic, for tests

pub mod manual;
pub mod tokio_executor;

pub use self::manual::{ManualExecutor, Submission};
pub use self::tokio_executor::TokioExecutor;
