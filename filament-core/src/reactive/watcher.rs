//! Watcher
//!
//! A watcher observes a set of computations and raises a single notification
//! when one of them goes from clean to stale. It never reruns anything
//! itself: the owner decides when to pull [`Watcher::pending`] and refresh.
//!
//! After notifying, the watcher stays quiet until it is re-armed, either by
//! [`Watcher::watch`] or [`Watcher::rearm`]. This lets the owner collapse any
//! number of staleness events into one scheduled flush.
//!
//! Pending computations are reported in watch order, so a flush is
//! deterministic.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::id::ReactiveId;
use super::memo::Computed;

/// A watched computation, as seen by the watcher's owner.
pub trait Tracked {
    /// Id of the computation.
    fn id(&self) -> ReactiveId;

    /// Whether the computation may need to rerun.
    fn is_stale(&self) -> bool;

    /// Re-validate the computation, rerunning it if a source changed.
    fn refresh(&self);
}

pub(crate) struct WatcherShared {
    notify: Box<dyn Fn()>,
    watched: RefCell<IndexMap<ReactiveId, Rc<dyn Tracked>>>,
    armed: Cell<bool>,
}

impl WatcherShared {
    /// Called by a watched computation that just went stale.
    pub(crate) fn stale(&self) {
        if self.armed.replace(false) {
            (self.notify)();
        }
    }
}

/// Observes computations and reports when they become stale.
pub struct Watcher {
    shared: Rc<WatcherShared>,
}

impl Watcher {
    /// Create a watcher that calls `notify` when a watched computation goes
    /// stale.
    ///
    /// `notify` runs in the middle of a write. It must not read or write
    /// reactive values; schedule work instead.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            shared: Rc::new(WatcherShared {
                notify: Box::new(notify),
                watched: RefCell::new(IndexMap::new()),
                armed: Cell::new(true),
            }),
        }
    }

    /// Start watching `computed` and re-arm the notification.
    pub fn watch<T: PartialEq + 'static>(&self, computed: &Computed<T>) {
        let node = computed.node.clone();
        node.attach_watcher(Rc::downgrade(&self.shared));
        let tracked: Rc<dyn Tracked> = node;
        self.shared
            .watched
            .borrow_mut()
            .insert(computed.id(), tracked);
        self.rearm();
    }

    /// Stop watching `computed`. It will no longer be reported as pending.
    pub fn unwatch<T: PartialEq + 'static>(&self, computed: &Computed<T>) {
        computed.node.detach_watcher();
        self.shared.watched.borrow_mut().shift_remove(&computed.id());
    }

    /// Allow the next staleness event to notify again.
    pub fn rearm(&self) {
        self.shared.armed.set(true);
    }

    /// Whether the computation with `id` is currently watched.
    pub fn is_watching(&self, id: ReactiveId) -> bool {
        self.shared.watched.borrow().contains_key(&id)
    }

    /// Stale watched computations, in watch order.
    pub fn pending(&self) -> Vec<Rc<dyn Tracked>> {
        self.shared
            .watched
            .borrow()
            .values()
            .filter(|tracked| tracked.is_stale())
            .cloned()
            .collect()
    }

    /// Number of watched computations.
    pub fn len(&self) -> usize {
        self.shared.watched.borrow().len()
    }

    /// Whether nothing is watched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
