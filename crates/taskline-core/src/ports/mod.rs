//! Ports - abstractions over the facilities the engine depends on.
//!
//! The only external facility the queue needs is something that runs a
//! callable on a named context after a delay. Implementations live in
//! [`crate::impls`].

pub mod executor;

pub use self::executor::{ExecutionContext, Executor, Job};
