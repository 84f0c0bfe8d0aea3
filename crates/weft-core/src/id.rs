//! Process-wide identifier allocation.
//!
//! Every connection, channel, query, and message gets its id from one
//! monotonic allocator, so ids are unique across the whole session and
//! their ordering doubles as global creation order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque session identifier.
///
/// Ids are only ever produced by [`IdAlloc`] and are strictly increasing
/// for the lifetime of the process. They are never reused, even after the
/// thing they identified is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// Raw value, for logging and display only.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source.
///
/// Owned by the session model; the dispatch queue serializes all access,
/// including allocations made while draining follow-up events.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IdAlloc {
    next: u64,
}

impl IdAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id strictly greater than every id issued before it.
    pub fn next_id(&mut self) -> Id {
        let id = Id(self.next);
        self.next += 1;
        id
    }
}
