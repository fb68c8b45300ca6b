//! Control Flow
//!
//! Reconcilers for dynamic regions of the tree:
//!
//! - [`Show`] mounts one of two branches depending on a signal's truthiness
//! - [`For`] renders a list keyed by item value, moving existing subtrees
//!   when items are reordered
//! - [`Index`] renders a list keyed by position, updating each position's
//!   item in place
//!
//! Each region is anchored on a comment marker and only ever touches the
//! nodes in front of it. Child subtrees are mounted with tracking suspended,
//! so reads made while building a branch never subscribe the reconciler.

mod for_each;
mod index;
mod show;

use std::fmt;
use std::rc::Rc;

use crate::reactive::{Computed, State};

pub use for_each::For;
pub use index::Index;
pub use show::{Show, Truthy};

/// List input for [`For`] and [`Index`]: a plain vector or a signal of one.
pub enum Each<T: 'static> {
    Static(Rc<[T]>),
    State(State<Vec<T>>),
    Computed(Computed<Vec<T>>),
}

impl<T: Clone + PartialEq + 'static> Each<T> {
    /// Borrow the current items, tracking the read when it comes from a
    /// signal.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        match self {
            Each::Static(items) => f(items),
            Each::State(state) => state.with(|items| f(items)),
            Each::Computed(computed) => computed.with(|items| f(items)),
        }
    }

    pub fn get(&self) -> Vec<T> {
        self.with(<[T]>::to_vec)
    }
}

impl<T> Clone for Each<T> {
    fn clone(&self) -> Self {
        match self {
            Each::Static(items) => Each::Static(items.clone()),
            Each::State(state) => Each::State(state.clone()),
            Each::Computed(computed) => Each::Computed(computed.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Each<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Each::Static(items) => f.debug_tuple("Static").field(items).finish(),
            Each::State(state) => f.debug_tuple("State").field(&state.id()).finish(),
            Each::Computed(computed) => f.debug_tuple("Computed").field(&computed.id()).finish(),
        }
    }
}

impl<T> From<Vec<T>> for Each<T> {
    fn from(items: Vec<T>) -> Self {
        Each::Static(items.into())
    }
}

impl<T> From<State<Vec<T>>> for Each<T> {
    fn from(state: State<Vec<T>>) -> Self {
        Each::State(state)
    }
}

impl<T> From<Computed<Vec<T>>> for Each<T> {
    fn from(computed: Computed<Vec<T>>) -> Self {
        Each::Computed(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_reads_every_source() {
        let state = State::new(vec![1, 2]);
        let doubled = {
            let state = state.clone();
            Computed::new(move || state.get().into_iter().map(|n| n * 2).collect::<Vec<_>>())
        };

        assert_eq!(Each::from(vec![7]).get(), vec![7]);
        assert_eq!(Each::from(state.clone()).get(), vec![1, 2]);
        assert_eq!(Each::from(doubled).with(|items| items.len()), 2);
    }

    #[test]
    fn debug_names_the_source() {
        let state = State::new(vec![1]);
        let copy = {
            let state = state.clone();
            Computed::new(move || state.get())
        };

        assert_eq!(format!("{:?}", Each::from(vec![3])), "Static([3])");
        assert_eq!(format!("{:?}", Each::from(state.clone())), format!("State({:?})", state.id()));
        assert_eq!(format!("{:?}", Each::from(copy.clone())), format!("Computed({:?})", copy.id()));
    }
}
