//! Effect Scheduler
//!
//! Effects are computations run for their side effects. The scheduler keeps
//! them alive in a single thread-local [`Watcher`] and reruns the stale ones
//! in batches.
//!
//! # How It Works
//!
//! 1. [`effect`] wraps a callback in a `Computed<()>`, watches it and runs it
//!    once synchronously, so first-run side effects are visible immediately.
//!
//! 2. A write never runs effects. It marks them stale; the watcher notifies
//!    once, and the scheduler sets `pending` and queues one flush microtask.
//!
//! 3. The flush clears `pending`, snapshots the stale effects, re-arms the
//!    watcher and refreshes every snapshot entry that is still watched. An
//!    effect disposed earlier in the same flush is skipped.
//!
//! 4. Writes made by effects during a flush notify the re-armed watcher and
//!    queue another flush microtask. Nothing recurses.
//!
//! # Microtasks
//!
//! There is no host event loop, so the queue is explicit: the embedder calls
//! [`run_microtasks`] whenever it yields, which drains the queue to
//! completion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::{error, trace, warn};

use crate::cleanup::Disposer;
use crate::config::RuntimeConfig;
use crate::error::{RenderError, Result};
use crate::reactive::{Computed, Watcher};

type Microtask = Box<dyn FnOnce() -> Result<()>>;

thread_local! {
    static SCHEDULER: Scheduler = Scheduler::new();
}

/// The per-thread scheduling state.
pub struct Scheduler {
    watcher: Watcher,
    pending: Cell<bool>,
    queue: RefCell<VecDeque<Microtask>>,
    errors: RefCell<Vec<RenderError>>,
    config: RefCell<RuntimeConfig>,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            watcher: Watcher::new(|| Scheduler::with(Scheduler::schedule_flush)),
            pending: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            errors: RefCell::new(Vec::new()),
            config: RefCell::new(RuntimeConfig::default()),
        }
    }

    /// Run `f` against this thread's scheduler, creating it on first use.
    pub fn with<R>(f: impl FnOnce(&Scheduler) -> R) -> R {
        SCHEDULER.with(f)
    }

    fn schedule_flush(&self) {
        if !self.pending.replace(true) {
            self.queue_microtask(Box::new(|| Scheduler::with(Scheduler::flush)));
        }
    }

    fn flush(&self) -> Result<()> {
        self.pending.set(false);
        let stale = self.watcher.pending();
        self.watcher.rearm();
        trace!(effects = stale.len(), "flushing effects");

        for tracked in stale {
            if self.watcher.is_watching(tracked.id()) {
                tracked.refresh();
            }
        }

        let mut errors = self.errors.take().into_iter();
        match errors.next() {
            Some(first) => {
                for extra in errors {
                    error!(error = %extra, "effect failed during flush");
                }
                Err(first)
            }
            None => Ok(()),
        }
    }

    fn queue_microtask(&self, task: Microtask) {
        self.queue.borrow_mut().push_back(task);
    }

    fn run_microtasks(&self) -> Result<()> {
        let limit = self.config.borrow().max_microtask_turns;
        let mut turns = 0;
        let mut first_error = None;

        loop {
            let task = self.queue.borrow_mut().pop_front();
            let Some(task) = task else { break };

            turns += 1;
            if turns > limit {
                let dropped = {
                    let mut queue = self.queue.borrow_mut();
                    let dropped = queue.len() + 1;
                    queue.clear();
                    dropped
                };
                self.pending.set(false);
                // Effects left stale here only flush again once the watcher
                // can notify.
                self.watcher.rearm();
                warn!(limit, dropped, "microtask queue did not settle");
                return Err(RenderError::FlushLimit(limit));
            }

            if let Err(err) = task() {
                error!(error = %err, "microtask failed");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn report(&self, err: RenderError) {
        self.errors.borrow_mut().push(err);
    }
}

/// Queue `task` to run on the next [`run_microtasks`].
pub fn queue_microtask(task: impl FnOnce() -> Result<()> + 'static) {
    Scheduler::with(|scheduler| scheduler.queue_microtask(Box::new(task)));
}

/// Drain the microtask queue, including tasks queued while draining.
///
/// Every failing task is logged; the first error is returned once the queue
/// is empty.
pub fn run_microtasks() -> Result<()> {
    Scheduler::with(Scheduler::run_microtasks)
}

/// Whether a flush is queued and has not run yet.
pub fn is_flush_pending() -> bool {
    Scheduler::with(|scheduler| scheduler.pending.get())
}

/// Number of live effects on this thread.
pub fn watched_effects() -> usize {
    Scheduler::with(|scheduler| scheduler.watcher.len())
}

/// Install `config` for this thread.
pub fn configure(config: RuntimeConfig) {
    Scheduler::with(|scheduler| *scheduler.config.borrow_mut() = config);
}

/// The configuration active on this thread.
pub fn config() -> RuntimeConfig {
    Scheduler::with(|scheduler| scheduler.config.borrow().clone())
}

/// Run `callback` now and again whenever something it read changes.
///
/// Returns a disposer that stops the effect. If the first run fails, the
/// effect is disposed and the error returned.
pub fn effect<F>(callback: F) -> Result<Disposer>
where
    F: FnMut() -> Result<()> + 'static,
{
    let callback = RefCell::new(callback);
    let computation = Computed::new(move || {
        let Ok(mut callback) = callback.try_borrow_mut() else {
            warn!("effect re-entered while running");
            return;
        };
        if let Err(err) = callback() {
            Scheduler::with(|scheduler| scheduler.report(err));
        }
    });

    let (before, disposer) = Scheduler::with(|scheduler| {
        let before = scheduler.errors.borrow().len();
        scheduler.watcher.watch(&computation);
        let disposer = {
            let computation = computation.clone();
            Disposer::from_fn(move || {
                Scheduler::with(|scheduler| scheduler.watcher.unwatch(&computation));
                computation.dispose();
            })
        };
        (before, disposer)
    });

    computation.refresh();

    let mut failures = Scheduler::with(|scheduler| scheduler.errors.borrow_mut().split_off(before));
    if failures.is_empty() {
        return Ok(disposer);
    }

    disposer.dispose();
    for extra in failures.drain(1..) {
        error!(error = %extra, "nested effect failed during first run");
    }
    Err(failures.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::State;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(i32)) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |value| sink.borrow_mut().push(value))
    }

    #[test]
    fn effect_runs_immediately() {
        let (log, push) = recorder();
        let count = State::new(1);
        let _dispose = {
            let count = count.clone();
            effect(move || {
                push(count.get());
                Ok(())
            })
            .unwrap()
        };

        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn writes_are_batched_until_microtasks_run() {
        let (log, push) = recorder();
        let count = State::new(0);
        let _dispose = {
            let count = count.clone();
            effect(move || {
                push(count.get());
                Ok(())
            })
            .unwrap()
        };

        count.set(1);
        count.set(2);
        count.set(3);
        assert_eq!(*log.borrow(), vec![0]);
        assert!(is_flush_pending());

        run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec![0, 3]);
        assert!(!is_flush_pending());
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let (log, push) = recorder();
        let count = State::new(0);
        let dispose = {
            let count = count.clone();
            effect(move || {
                push(count.get());
                Ok(())
            })
            .unwrap()
        };

        count.set(1);
        dispose.dispose();
        run_microtasks().unwrap();

        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn writes_during_flush_schedule_another_flush() {
        let (log, push) = recorder();
        let source = State::new(0);
        let mirror = State::new(0);

        let _copy = {
            let (source, mirror) = (source.clone(), mirror.clone());
            effect(move || {
                mirror.set(source.get() * 10);
                Ok(())
            })
            .unwrap()
        };
        let _observe = {
            let mirror = mirror.clone();
            effect(move || {
                push(mirror.get());
                Ok(())
            })
            .unwrap()
        };

        source.set(2);
        run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec![0, 20]);
    }

    #[test]
    fn first_run_errors_are_returned() {
        let err = effect(|| Err(RenderError::DuplicateItem("1".into()))).unwrap_err();
        assert!(matches!(err, RenderError::DuplicateItem(_)));
        assert_eq!(watched_effects(), 0);
    }

    #[test]
    fn flush_errors_surface_from_run_microtasks() {
        let count = State::new(0);
        let _dispose = {
            let count = count.clone();
            effect(move || {
                if count.get() > 0 {
                    return Err(RenderError::UnknownProperty("x:y".into()));
                }
                Ok(())
            })
            .unwrap()
        };

        count.set(1);
        let err = run_microtasks().unwrap_err();
        assert!(matches!(err, RenderError::UnknownProperty(_)));
    }

    #[test]
    fn runaway_effects_hit_the_turn_limit() {
        configure(RuntimeConfig {
            max_microtask_turns: 5,
            ..RuntimeConfig::default()
        });
        let count = State::new(0);
        let _dispose = {
            let count = count.clone();
            effect(move || {
                let next = count.get() + 1;
                count.set(next);
                Ok(())
            })
            .unwrap()
        };

        let err = run_microtasks().unwrap_err();
        assert!(matches!(err, RenderError::FlushLimit(5)));
        assert!(!is_flush_pending());
        configure(RuntimeConfig::default());
    }

    #[test]
    fn effects_still_run_after_the_turn_limit() {
        configure(RuntimeConfig {
            max_microtask_turns: 5,
            ..RuntimeConfig::default()
        });
        let (log, push) = recorder();
        let other = State::new(0);
        let _observe = {
            let other = other.clone();
            effect(move || {
                push(other.get());
                Ok(())
            })
            .unwrap()
        };

        let running = Rc::new(Cell::new(true));
        let count = State::new(0);
        let _runaway = {
            let (count, running) = (count.clone(), running.clone());
            effect(move || {
                let next = count.get() + 1;
                if running.get() {
                    count.set(next);
                }
                Ok(())
            })
            .unwrap()
        };

        let err = run_microtasks().unwrap_err();
        assert!(matches!(err, RenderError::FlushLimit(5)));

        running.set(false);
        other.set(7);
        run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec![0, 7]);

        count.set(100);
        run_microtasks().unwrap();
        assert_eq!(count.get(), 100);
        configure(RuntimeConfig::default());
    }

    #[test]
    fn microtasks_run_in_fifo_order() {
        let (log, push) = recorder();
        let push = Rc::new(push);
        for i in 0..3 {
            let push = push.clone();
            queue_microtask(move || {
                push(i);
                Ok(())
            });
        }
        run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }
}
