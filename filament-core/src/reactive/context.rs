//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a state cell or a
//! computation is read, the running computation is recorded as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a computation pushes a
//! frame that collects the sources read during the evaluation; the guard pops
//! it again when dropped, even if the computation panics. An untracked frame
//! (see [`untrack`]) suspends tracking for everything nested inside it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::id::ReactiveId;
use super::runtime::{Dependency, Observer, Source};

pub(crate) type Dependencies = SmallVec<[Dependency; 4]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Frame>>> = const { RefCell::new(Vec::new()) };
}

/// An evaluation in progress.
struct Frame {
    observer_id: ReactiveId,
    observer: Weak<dyn Observer>,
    dependencies: Dependencies,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    depth: usize,
}

impl ReactiveContext {
    /// Enter a tracking frame for the given observer.
    pub(crate) fn enter(observer_id: ReactiveId, observer: Weak<dyn Observer>) -> Self {
        Self::push(Some(Frame {
            observer_id,
            observer,
            dependencies: SmallVec::new(),
        }))
    }

    /// Enter a frame in which reads are not tracked.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(frame: Option<Frame>) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(frame);
            stack.len()
        });
        Self { depth }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// Get the id of the computation currently being tracked, if any.
    pub fn current_observer() -> Option<ReactiveId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|frame| frame.as_ref().map(|frame| frame.observer_id))
        })
    }

    /// Record a read of `source` in the current frame.
    pub(crate) fn track(source: Rc<dyn Source>) {
        let observer = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let frame = stack.last_mut()?.as_mut()?;
            let id = source.id();
            if frame.dependencies.iter().any(|dep| dep.source.id() == id) {
                return None;
            }
            frame.dependencies.push(Dependency {
                source: source.clone(),
                version: source.version(),
            });
            Some(frame.observer.clone())
        });

        // Subscribe outside the stack borrow.
        if let Some(observer) = observer {
            source.subscribe(observer);
        }
    }

    /// Take the dependencies collected so far by this frame.
    pub(crate) fn take_dependencies(&self) -> Dependencies {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .get_mut(self.depth - 1)
                .and_then(|frame| frame.as_mut())
                .map(|frame| std::mem::take(&mut frame.dependencies))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext mismatch: expected depth {}, got {}",
                self.depth,
                stack.len()
            );
            stack.pop();
        });
    }
}

/// Run `f` without tracking any of the reads it performs.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::runtime::ComputedState;
    use std::cell::Cell;

    struct Probe {
        id: ReactiveId,
        version: Cell<u64>,
        subscribed: Cell<usize>,
    }

    impl Source for Probe {
        fn id(&self) -> ReactiveId {
            self.id
        }

        fn version(&self) -> u64 {
            self.version.get()
        }

        fn refresh(&self) {}

        fn subscribe(&self, _observer: Weak<dyn Observer>) {
            self.subscribed.set(self.subscribed.get() + 1);
        }

        fn unsubscribe(&self, _observer: ReactiveId) {}
    }

    struct Sink(ReactiveId);

    impl Observer for Sink {
        fn id(&self) -> ReactiveId {
            self.0
        }

        fn mark(&self, _state: ComputedState) {}
    }

    fn probe() -> Rc<Probe> {
        Rc::new(Probe {
            id: ReactiveId::new(),
            version: Cell::new(3),
            subscribed: Cell::new(0),
        })
    }

    fn sink() -> (ReactiveId, Rc<dyn Observer>) {
        let id = ReactiveId::new();
        (id, Rc::new(Sink(id)))
    }

    #[test]
    fn context_tracks_observer() {
        let (id, observer) = sink();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_observer().is_none());

        {
            let _ctx = ReactiveContext::enter(id, Rc::downgrade(&observer));
            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_observer(), Some(id));
        }

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_observer().is_none());
    }

    #[test]
    fn context_collects_deduplicated_dependencies() {
        let (id, observer) = sink();
        let source = probe();
        let ctx = ReactiveContext::enter(id, Rc::downgrade(&observer));

        ReactiveContext::track(source.clone());
        ReactiveContext::track(source.clone());

        let deps = ctx.take_dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version, 3);
        assert_eq!(source.subscribed.get(), 1);
    }

    #[test]
    fn untracked_frames_suspend_tracking() {
        let (id, observer) = sink();
        let source = probe();
        let ctx = ReactiveContext::enter(id, Rc::downgrade(&observer));

        untrack(|| {
            assert!(!ReactiveContext::is_active());
            ReactiveContext::track(source.clone());
        });

        assert!(ctx.take_dependencies().is_empty());
        assert_eq!(source.subscribed.get(), 0);
    }

    #[test]
    fn nested_contexts() {
        let (outer, outer_observer) = sink();
        let (inner, inner_observer) = sink();

        let _outer_ctx = ReactiveContext::enter(outer, Rc::downgrade(&outer_observer));
        {
            let _inner_ctx = ReactiveContext::enter(inner, Rc::downgrade(&inner_observer));
            assert_eq!(ReactiveContext::current_observer(), Some(inner));
        }
        assert_eq!(ReactiveContext::current_observer(), Some(outer));
    }
}
