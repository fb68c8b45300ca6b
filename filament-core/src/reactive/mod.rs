//! Reactive Primitives
//!
//! This module implements the signal substrate the renderer is built on:
//! state cells, computeds and the watcher.
//!
//! # Concepts
//!
//! ## State
//!
//! A [`State`] is a container for mutable data. When it is read within a
//! tracking context (such as a computed or an effect), the cell registers
//! that context as a dependent. When the value changes, all dependents are
//! marked dirty.
//!
//! ## Computed
//!
//! A [`Computed`] is a derived value that caches its result. It is lazy: it
//! re-evaluates only when read after one of its dependencies changed.
//!
//! ## Watcher
//!
//! A [`Watcher`] observes a set of computeds and raises one notification
//! when any of them becomes stale. The effect scheduler in
//! [`crate::scheduler`] is built on a single watcher.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically. When a value is read, we check if there is an
//! active tracking frame and, if so, record the dependency.

mod context;
mod id;
mod memo;
mod runtime;
mod signal;
mod watcher;

pub use context::{untrack, ReactiveContext};
pub use id::ReactiveId;
pub use memo::Computed;
pub use runtime::ComputedState;
pub use signal::{Signal, State};
pub use watcher::{Tracked, Watcher};
