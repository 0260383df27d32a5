//! Queue identifiers.
//!
//! Every queue gets a ULID at construction. The id only exists for
//! diagnostics: log fields and the status descriptor. Nothing in the engine
//! looks a queue up by id.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a single [`Queue`](crate::queue::Queue) instance.
///
/// ULIDs sort by creation time, so queues created later print later in
/// sorted logs. Displayed as `queue-<ulid>`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueId(Ulid);

impl QueueId {
    /// Generate a fresh id from the current time.
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue-{}", self.0)
    }
}

impl From<Ulid> for QueueId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}
