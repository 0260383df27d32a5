//! Domain model: tasks, the values they pass along, and queue identifiers.

pub mod ids;
pub mod task;

pub use ids::QueueId;
pub use task::{Task, TaskValue};
