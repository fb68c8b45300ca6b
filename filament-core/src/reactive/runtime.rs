//! Reactive Runtime
//!
//! The runtime is the set of edges that connects state cells, computations and
//! the watcher. It is not a central registry: every node keeps its own edges.
//!
//! # How It Works
//!
//! 1. When a computation reads a state cell or another computation, the
//!    tracking context records a [`Dependency`] and the source remembers the
//!    reader as a subscriber.
//!
//! 2. When a state cell changes, it marks its subscribers `Dirty`. A
//!    computation that goes stale marks its own subscribers `MaybeDirty`,
//!    and if it is watched it notifies its watcher.
//!
//! 3. Nothing is recomputed during marking. Computations are lazy: they
//!    re-validate on the next read, and only rerun when a source version
//!    actually moved.
//!
//! # Ownership
//!
//! Readers hold strong references to their sources, sources hold weak
//! references to their readers. Dropping the last handle to a computation
//! therefore frees it, and dead subscribers are pruned on the next
//! notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::id::ReactiveId;

/// Freshness of a computation's cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A transitive source might have changed. Sources must be re-validated.
    MaybeDirty,

    /// A direct source changed. The computation must rerun.
    Dirty,
}

/// Something that can be read inside a tracking context.
pub(crate) trait Source {
    fn id(&self) -> ReactiveId;

    /// Monotonic counter bumped whenever the observable value changes.
    fn version(&self) -> u64;

    /// Bring the value up to date. State cells are always fresh.
    fn refresh(&self);

    fn subscribe(&self, observer: Weak<dyn Observer>);

    fn unsubscribe(&self, observer: ReactiveId);
}

/// Something that reads sources and wants to hear when they change.
pub(crate) trait Observer {
    fn id(&self) -> ReactiveId;

    fn mark(&self, state: ComputedState);
}

/// A source read during one evaluation, with the version that was observed.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub(crate) source: Rc<dyn Source>,
    pub(crate) version: u64,
}

impl Dependency {
    /// Refresh the source and report whether it moved since it was read.
    pub(crate) fn changed(&self) -> bool {
        self.source.refresh();
        self.source.version() != self.version
    }
}

/// The subscriber list of a source, kept in subscription order.
#[derive(Default)]
pub(crate) struct Subscribers {
    observers: RefCell<IndexMap<ReactiveId, Weak<dyn Observer>>>,
}

impl Subscribers {
    pub(crate) fn add(&self, observer: Weak<dyn Observer>) {
        if let Some(live) = observer.upgrade() {
            self.observers.borrow_mut().insert(live.id(), observer);
        }
    }

    pub(crate) fn remove(&self, id: ReactiveId) {
        self.observers.borrow_mut().shift_remove(&id);
    }

    /// Mark every live subscriber. Dead ones are pruned.
    pub(crate) fn notify(&self, state: ComputedState) {
        // Snapshot first: marking may subscribe or unsubscribe.
        let snapshot: Vec<(ReactiveId, Weak<dyn Observer>)> = self
            .observers
            .borrow()
            .iter()
            .map(|(id, weak)| (*id, weak.clone()))
            .collect();

        for (id, weak) in snapshot {
            match weak.upgrade() {
                Some(observer) => observer.mark(state),
                None => self.remove(id),
            }
        }
    }

    /// Number of subscribers still alive.
    pub(crate) fn len(&self) -> usize {
        self.observers
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
