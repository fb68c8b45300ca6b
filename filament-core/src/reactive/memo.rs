//! Computed Implementation
//!
//! A `Computed` is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. Nothing runs at construction. The first read evaluates and caches.
//!
//! 2. When a direct source changes the computed is marked `Dirty`; when a
//!    transitive source changes it is marked `MaybeDirty`.
//!
//! 3. On the next read a `MaybeDirty` computed refreshes its sources in
//!    order and reruns only if one of their versions moved. A `Dirty` one
//!    reruns unconditionally.
//!
//! 4. A rerun that produces a value equal to the cache does not bump the
//!    version, so readers further downstream stop re-validating there.
//!
//! Dependencies are rediscovered on every evaluation: the previous edges are
//! dropped before the computation runs again.
//!
//! Effects are `Computed<()>` values kept alive by the scheduler's watcher,
//! see [`crate::scheduler`].

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use super::context::{Dependencies, ReactiveContext};
use super::id::ReactiveId;
use super::runtime::{ComputedState, Observer, Source, Subscribers};
use super::signal::Signal;
use super::watcher::{Tracked, WatcherShared};

pub(crate) struct ComputedNode<T> {
    id: ReactiveId,
    this: Weak<ComputedNode<T>>,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    state: Cell<ComputedState>,
    version: Cell<u64>,
    evaluations: Cell<usize>,
    sources: RefCell<Dependencies>,
    subscribers: Subscribers,
    watcher: RefCell<Option<Weak<WatcherShared>>>,
}

impl<T: PartialEq + 'static> ComputedNode<T> {
    fn update_if_necessary(&self) {
        match self.state.get() {
            ComputedState::Clean => return,
            ComputedState::MaybeDirty => {
                let sources = self.sources.borrow().clone();
                if !sources.iter().any(|dep| dep.changed()) {
                    // A source refresh may have marked us dirty meanwhile.
                    if self.state.get() == ComputedState::MaybeDirty {
                        self.state.set(ComputedState::Clean);
                        return;
                    }
                }
            }
            ComputedState::Dirty => {}
        }
        self.recompute();
    }

    fn recompute(&self) {
        self.unlink();

        // Clean before running: a write to one of our sources during the
        // run marks us dirty again instead of being lost.
        self.state.set(ComputedState::Clean);

        let observer: Weak<dyn Observer> = self.this.clone();
        let ctx = ReactiveContext::enter(self.id, observer);
        let value = (self.compute)();
        let dependencies = ctx.take_dependencies();
        drop(ctx);

        *self.sources.borrow_mut() = dependencies;
        self.evaluations.set(self.evaluations.get() + 1);

        let changed = self.value.borrow().as_ref() != Some(&value);
        if changed {
            *self.value.borrow_mut() = Some(value);
            self.version.set(self.version.get() + 1);
        }
    }

    /// Drop every edge to our sources.
    fn unlink(&self) {
        let previous = std::mem::take(&mut *self.sources.borrow_mut());
        for dep in previous {
            dep.source.unsubscribe(self.id);
        }
    }

    pub(crate) fn attach_watcher(&self, watcher: Weak<WatcherShared>) {
        *self.watcher.borrow_mut() = Some(watcher);
    }

    pub(crate) fn detach_watcher(&self) {
        self.watcher.borrow_mut().take();
    }
}

impl<T: PartialEq + 'static> Source for ComputedNode<T> {
    fn id(&self) -> ReactiveId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn refresh(&self) {
        self.update_if_necessary();
    }

    fn subscribe(&self, observer: Weak<dyn Observer>) {
        self.subscribers.add(observer);
    }

    fn unsubscribe(&self, observer: ReactiveId) {
        self.subscribers.remove(observer);
    }
}

impl<T: PartialEq + 'static> Observer for ComputedNode<T> {
    fn id(&self) -> ReactiveId {
        self.id
    }

    fn mark(&self, state: ComputedState) {
        match self.state.get() {
            ComputedState::Clean => {
                self.state.set(state);
                self.subscribers.notify(ComputedState::MaybeDirty);
                let watcher = self.watcher.borrow().as_ref().and_then(Weak::upgrade);
                if let Some(watcher) = watcher {
                    watcher.stale();
                }
            }
            ComputedState::MaybeDirty if state == ComputedState::Dirty => {
                self.state.set(ComputedState::Dirty);
            }
            _ => {}
        }
    }
}

impl<T: PartialEq + 'static> Tracked for ComputedNode<T> {
    fn id(&self) -> ReactiveId {
        self.id
    }

    fn is_stale(&self) -> bool {
        self.state.get() != ComputedState::Clean
    }

    fn refresh(&self) {
        self.update_if_necessary();
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. The `PartialEq` bound detects when
///   a rerun actually produced a different value.
pub struct Computed<T: 'static> {
    pub(crate) node: Rc<ComputedNode<T>>,
}

impl<T: PartialEq + 'static> Computed<T> {
    /// Create a new computed with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let node = Rc::new_cyclic(|this| ComputedNode {
            id: ReactiveId::new(),
            this: this.clone(),
            compute: Box::new(compute),
            value: RefCell::new(None),
            state: Cell::new(ComputedState::Dirty),
            version: Cell::new(0),
            evaluations: Cell::new(0),
            sources: RefCell::new(Dependencies::new()),
            subscribers: Subscribers::default(),
            watcher: RefCell::new(None),
        });
        Self { node }
    }

    /// Borrow the current value, recomputing if necessary and tracking the
    /// read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.update_if_necessary();
        let source: Rc<dyn Source> = self.node.clone();
        ReactiveContext::track(source);
        self.with_cached(f)
    }

    /// Borrow the current value, recomputing if necessary, without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node.update_if_necessary();
        self.with_cached(f)
    }

    fn with_cached<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.node.value.borrow();
        f(value
            .as_ref()
            .expect("refreshed computed should have a value"))
    }

    /// Bring the value up to date without reading it.
    pub fn refresh(&self) {
        self.node.update_if_necessary();
    }

    /// Drop every dependency edge. The computed reruns if read again.
    pub fn dispose(&self) {
        self.node.unlink();
        self.node.state.set(ComputedState::Dirty);
    }
}

impl<T: 'static> Computed<T> {
    /// Get the computed's unique id.
    pub fn id(&self) -> ReactiveId {
        self.node.id
    }

    /// Get the current freshness state.
    pub fn state(&self) -> ComputedState {
        self.node.state.get()
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.node.value.borrow().is_some()
    }

    /// Number of times the computation has run.
    pub fn evaluation_count(&self) -> usize {
        self.node.evaluations.get()
    }

    /// Number of sources read during the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.node.sources.borrow().len()
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.node.subscribers.len()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: PartialEq + Debug + 'static> Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.node.id)
            .field("state", &self.state())
            .field("value", &*self.node.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
