//! Cleanup scopes.
//!
//! Every render call runs inside a scope: an ordered list of teardown
//! callbacks. Nested renders return their own [`Disposer`] and register it in
//! the enclosing scope, so disposing a root tears down the whole tree.
//!
//! The current scope is thread-local. [`with_scope`] installs a fresh one for
//! the dynamic extent of a closure and restores the previous one on every exit
//! path, panics included.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::error::{RenderError, Result};
use crate::scheduler;

/// A teardown callback.
pub type Cleanup = Box<dyn FnOnce()>;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Disposer>> = const { RefCell::new(None) };
}

/// Handle to one scope's teardown callbacks.
///
/// Clones share the same list.
#[derive(Clone, Default)]
pub struct Disposer {
    callbacks: Rc<RefCell<Vec<Cleanup>>>,
}

impl Disposer {
    /// A disposer with a single callback.
    pub fn from_fn(cleanup: impl FnOnce() + 'static) -> Self {
        let disposer = Self::default();
        disposer.push(Box::new(cleanup));
        disposer
    }

    pub(crate) fn push(&self, cleanup: Cleanup) {
        self.callbacks.borrow_mut().push(cleanup);
    }

    /// Run every registered callback once, in registration order.
    ///
    /// The list is emptied first, so calling this again is a no-op.
    pub fn dispose(&self) {
        let callbacks = mem::take(&mut *self.callbacks.borrow_mut());
        for cleanup in callbacks {
            cleanup();
        }
    }

    /// Number of callbacks still registered.
    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Whether there is nothing left to run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn this disposer into a plain cleanup callback.
    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || self.dispose())
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("pending", &self.len())
            .finish()
    }
}

/// Restores the previous scope when dropped.
struct ScopeGuard {
    previous: Option<Disposer>,
}

impl ScopeGuard {
    fn install(scope: Disposer) -> Self {
        let previous = CURRENT_SCOPE.with(|current| current.borrow_mut().replace(scope));
        Self { previous }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_SCOPE.with(|current| *current.borrow_mut() = previous);
    }
}

/// Run `f` with a fresh scope installed as current.
///
/// Returns the scope's disposer alongside `f`'s result. The previous scope is
/// restored whether `f` succeeds, fails or panics.
pub fn with_scope<R>(f: impl FnOnce() -> R) -> (Disposer, R) {
    let scope = Disposer::default();
    let guard = ScopeGuard::install(scope.clone());
    let result = f();
    drop(guard);
    (scope, result)
}

/// Whether a render scope is active.
pub fn in_render_context() -> bool {
    CURRENT_SCOPE.with(|current| current.borrow().is_some())
}

fn current_scope() -> Result<Disposer> {
    CURRENT_SCOPE
        .with(|current| current.borrow().clone())
        .ok_or(RenderError::NotInRenderContext)
}

/// Register `cleanup` in the current scope.
///
/// Fails with [`RenderError::NotInRenderContext`] outside a render.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) -> Result<()> {
    current_scope()?.push(Box::new(cleanup));
    Ok(())
}

/// Create an effect owned by the current scope.
pub fn create_effect(mut callback: impl FnMut() + 'static) -> Result<()> {
    create_render_effect(move || {
        callback();
        Ok(())
    })
}

/// Like [`create_effect`], for callbacks that can fail.
///
/// Errors from the first run are returned; errors from later runs are
/// reported by [`crate::run_microtasks`].
pub fn create_render_effect(callback: impl FnMut() -> Result<()> + 'static) -> Result<()> {
    let scope = current_scope()?;
    let disposer = scheduler::effect(callback)?;
    scope.push(disposer.into_cleanup());
    Ok(())
}
