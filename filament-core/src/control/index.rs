//! Positional list rendering.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::cleanup::{create_render_effect, on_cleanup, Disposer};
use crate::element::{Child, Element};
use crate::error::Result;
use crate::reactive::{untrack, Computed};
use crate::render::{create_marker, render_with_cleanup, Mount, Target};

use super::Each;

type Slot<T> = Rc<dyn Fn(Computed<T>, usize) -> Element>;

/// Render one subtree per position.
///
/// Only the length is tracked by the list itself. Each position reads its
/// item through a computed, so a changed item updates in place and a
/// reordered input changes contents rather than moving nodes.
pub struct Index<T: 'static> {
    each: Each<T>,
    children: Slot<T>,
    fallback: Option<Element>,
}

impl<T: Clone + PartialEq + 'static> Index<T> {
    pub fn new<E: Into<Element>>(
        each: impl Into<Each<T>>,
        children: impl Fn(Computed<T>, usize) -> E + 'static,
    ) -> Self {
        Self {
            each: each.into(),
            children: Rc::new(move |item, position| children(item, position).into()),
            fallback: None,
        }
    }

    /// Rendered in place of the list while it is empty.
    pub fn fallback(mut self, fallback: impl Into<Element>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

struct IndexList<T: 'static> {
    each: Each<T>,
    children: Slot<T>,
    fallback_element: Option<Element>,
    target: Target,
    positions: Vec<Disposer>,
    fallback: Option<Disposer>,
}

impl<T: Clone + PartialEq + 'static> IndexList<T> {
    /// The item at `position`, holding on to the last in-range value once
    /// the list shrinks below it.
    fn item(&self, position: usize, initial: T) -> Computed<T> {
        let each = self.each.clone();
        let last = RefCell::new(initial);
        Computed::new(move || {
            if let Some(item) = each.with(|items| items.get(position).cloned()) {
                *last.borrow_mut() = item;
            }
            last.borrow().clone()
        })
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        if let Some(fallback) = self.fallback.take() {
            fallback.dispose();
        }

        while self.positions.len() > len {
            if let Some(position) = self.positions.pop() {
                position.dispose();
            }
        }

        while self.positions.len() < len {
            let position = self.positions.len();
            let Some(initial) = self.each.with(|items| items.get(position).cloned()) else {
                break;
            };
            let item = self.item(position, initial);
            let element = (self.children)(item.clone(), position);
            let disposer = render_with_cleanup(&self.target, &element)?;
            disposer.push(Box::new(move || item.dispose()));
            self.positions.push(disposer);
        }

        if len == 0 {
            if let Some(fallback) = &self.fallback_element {
                self.fallback = Some(render_with_cleanup(&self.target, fallback)?);
            }
        }

        trace!(len, "resized indexed list");
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            fallback.dispose();
        }
        for position in self.positions.drain(..) {
            position.dispose();
        }
    }
}

impl<T: Clone + PartialEq + 'static> Mount for Index<T> {
    fn mount(&self, target: &Target) -> Result<()> {
        let (_, inner) = create_marker(target, "index")?;

        let length = {
            let each = self.each.clone();
            Computed::new(move || each.with(<[T]>::len))
        };

        let list = Rc::new(RefCell::new(IndexList {
            each: self.each.clone(),
            children: self.children.clone(),
            fallback_element: self.fallback.clone(),
            target: inner,
            positions: Vec::new(),
            fallback: None,
        }));
        {
            let list = list.clone();
            on_cleanup(move || list.borrow_mut().clear())?;
        }

        create_render_effect(move || {
            let len = length.get();
            untrack(|| list.borrow_mut().resize(len))
        })
    }
}

impl<T: Clone + PartialEq + 'static> From<Index<T>> for Element {
    fn from(list: Index<T>) -> Self {
        Element::Index(Rc::new(list))
    }
}

impl<T: Clone + PartialEq + 'static> From<Index<T>> for Child {
    fn from(list: Index<T>) -> Self {
        Child::Element(list.into())
    }
}
