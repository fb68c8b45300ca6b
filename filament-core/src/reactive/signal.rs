//! State Implementation
//!
//! A `State` is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How State Works
//!
//! 1. When a state cell is read within a tracking context (a computation or
//!    an effect), the cell registers that context as a subscriber.
//!
//! 2. When the value changes, every subscriber is marked dirty.
//!
//! 3. Dirty computations rerun the next time they are read; dirty effects
//!    rerun on the scheduler's next flush.
//!
//! Writing a value equal to the current one is a no-op, so no subscriber is
//! disturbed.
//!
//! # Threading
//!
//! State is single-threaded (`Rc` + `RefCell`). The renderer it feeds runs on
//! one thread with a cooperative microtask queue, so there is nothing to lock.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::id::ReactiveId;
use super::runtime::{ComputedState, Observer, Source, Subscribers};

/// Read access shared by [`State`] and [`Computed`](super::Computed).
///
/// Every API that accepts "a signal" accepts any implementor.
pub trait Signal<T> {
    /// Read the current value, tracking the read in the running computation.
    fn get(&self) -> T;

    /// Read the current value without tracking.
    fn get_untracked(&self) -> T {
        super::untrack(|| self.get())
    }
}

struct StateNode<T> {
    id: ReactiveId,
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: Subscribers,
}

impl<T: 'static> Source for StateNode<T> {
    fn id(&self) -> ReactiveId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version.get()
    }

    fn refresh(&self) {}

    fn subscribe(&self, observer: Weak<dyn Observer>) {
        self.subscribers.add(observer);
    }

    fn unsubscribe(&self, observer: ReactiveId) {
        self.subscribers.remove(observer);
    }
}

/// A mutable reactive cell holding a value of type `T`.
///
/// Cloning a `State` shares the cell.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::State;
///
/// let count = State::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct State<T: 'static> {
    node: Rc<StateNode<T>>,
}

impl<T: 'static> State<T> {
    /// Create a new state cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            node: Rc::new(StateNode {
                id: ReactiveId::new(),
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: Subscribers::default(),
            }),
        }
    }

    /// Get the cell's unique id.
    pub fn id(&self) -> ReactiveId {
        self.node.id
    }

    fn track(&self) {
        let source: Rc<dyn Source> = self.node.clone();
        ReactiveContext::track(source);
    }

    /// Borrow the current value, tracking the read.
    ///
    /// The value stays borrowed while `f` runs; writing to this cell from
    /// inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.node.value.borrow())
    }

    /// Borrow the current value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.node.value.borrow())
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.node.subscribers.len()
    }
}

impl<T: Clone + 'static> State<T> {
    /// Get the current value.
    ///
    /// If called within a tracking context, this also registers the running
    /// computation as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> State<T> {
    /// Set a new value and mark subscribers dirty.
    ///
    /// Does nothing when the new value equals the current one.
    pub fn set(&self, value: T) {
        {
            let mut current = self.node.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.node.version.set(self.node.version.get() + 1);
        self.node.subscribers.notify(ComputedState::Dirty);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.node.value.borrow());
        self.set(next);
    }
}

impl<T: Clone + 'static> Signal<T> for State<T> {
    fn get(&self) -> T {
        State::get(self)
    }

    fn get_untracked(&self) -> T {
        State::get_untracked(self)
    }
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Debug + 'static> Debug for State<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("id", &self.node.id)
            .field("value", &*self.node.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
