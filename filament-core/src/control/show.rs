//! Conditional rendering.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::cleanup::{create_render_effect, on_cleanup, Disposer};
use crate::element::Element;
use crate::error::Result;
use crate::reactive::{untrack, Computed, Signal};
use crate::render::{create_marker, render_with_cleanup, Mount, Target};

/// Values with a notion of truthiness.
///
/// `false` and `None` are falsy. [`Truthy::narrow`] extracts the value a
/// truthy branch gets to see.
pub trait Truthy: Clone + PartialEq + 'static {
    type Narrowed: Clone + PartialEq + 'static;

    fn narrow(&self) -> Option<Self::Narrowed>;

    fn is_truthy(&self) -> bool {
        self.narrow().is_some()
    }
}

impl Truthy for bool {
    type Narrowed = bool;

    fn narrow(&self) -> Option<bool> {
        self.then_some(true)
    }
}

impl<T: Clone + PartialEq + 'static> Truthy for Option<T> {
    type Narrowed = T;

    fn narrow(&self) -> Option<T> {
        self.clone()
    }
}

type Branch<N> = Rc<dyn Fn(Computed<N>) -> Element>;

/// Mount `children` while `when` is truthy, otherwise the fallback if any.
///
/// Only truthiness changes swap branches; a truthy value changing into
/// another truthy value leaves the mounted branch alone.
pub struct Show<W: Truthy> {
    when: Rc<dyn Signal<W>>,
    children: Branch<W::Narrowed>,
    fallback: Option<Element>,
}

impl<W: Truthy> Show<W> {
    pub fn new(when: impl Signal<W> + 'static, children: impl Into<Element>) -> Self {
        let children = children.into();
        Self::with_value(when, move |_| children.clone())
    }

    /// Like [`Show::new`], handing the branch a computed of the narrowed
    /// value. It holds the last truthy value, so the branch never observes a
    /// falsy one while it is being torn down.
    pub fn with_value<E: Into<Element>>(
        when: impl Signal<W> + 'static,
        children: impl Fn(Computed<W::Narrowed>) -> E + 'static,
    ) -> Self {
        Self {
            when: Rc::new(when),
            children: Rc::new(move |value| children(value).into()),
            fallback: None,
        }
    }

    pub fn fallback(mut self, fallback: impl Into<Element>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    fn narrowed(&self, initial: W::Narrowed) -> Computed<W::Narrowed> {
        let when = self.when.clone();
        let last = RefCell::new(initial);
        Computed::new(move || {
            if let Some(value) = when.get().narrow() {
                *last.borrow_mut() = value;
            }
            last.borrow().clone()
        })
    }
}

impl<W: Truthy> Mount for Show<W> {
    fn mount(&self, target: &Target) -> Result<()> {
        let (_, inner) = create_marker(target, "show")?;

        let is_truthy = {
            let when = self.when.clone();
            Computed::new(move || when.get().is_truthy())
        };

        let current: Rc<RefCell<Option<Disposer>>> = Rc::default();
        {
            let current = current.clone();
            on_cleanup(move || {
                if let Some(branch) = current.take() {
                    branch.dispose();
                }
            })?;
        }

        let show = Show {
            when: self.when.clone(),
            children: self.children.clone(),
            fallback: self.fallback.clone(),
        };
        create_render_effect(move || {
            if let Some(branch) = current.take() {
                branch.dispose();
            }

            let truthy = is_truthy.get();
            debug!(truthy, "show branch changed");
            let element = if truthy {
                match show.when.get_untracked().narrow() {
                    Some(initial) => (show.children)(show.narrowed(initial)),
                    None => return Ok(()),
                }
            } else {
                match &show.fallback {
                    Some(fallback) => fallback.clone(),
                    None => return Ok(()),
                }
            };

            let branch = untrack(|| render_with_cleanup(&inner, &element))?;
            current.replace(Some(branch));
            Ok(())
        })
    }
}

impl<W: Truthy> From<Show<W>> for Element {
    fn from(show: Show<W>) -> Self {
        Element::Show(Rc::new(show))
    }
}

impl<W: Truthy> From<Show<W>> for crate::element::Child {
    fn from(show: Show<W>) -> Self {
        crate::element::Child::Element(show.into())
    }
}
