//! Identity for nodes of the reactive graph.
//!
//! Every state cell and computation gets a `ReactiveId` when created. Ids are
//! used to deduplicate dependency edges and to key the watcher's set of
//! tracked computations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a state cell or computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactiveId(u64);

impl ReactiveId {
    /// Generate a new unique id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ReactiveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReactiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
