//! Keyed list rendering.
//!
//! Entries are keyed by item value. Each entry owns a comment marker, and its
//! DOM nodes are the contiguous run starting at that marker and ending before
//! the next entry marker or the list marker. Moving or evicting an entry moves
//! or removes that whole run, so nested dynamic regions travel with it.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::cleanup::{create_render_effect, on_cleanup, with_scope, Disposer};
use crate::dom::{Node, NodeId};
use crate::element::{Child, Element};
use crate::error::{RenderError, Result};
use crate::reactive::{untrack, State};
use crate::render::{render_element, render_with_cleanup, Mount, Target};
use crate::scheduler;

use super::Each;

type Row<T> = Rc<dyn Fn(T, State<usize>) -> Element>;

/// Render one subtree per distinct item, keyed by value.
///
/// Reordering the input moves existing subtrees instead of recreating them,
/// and each entry's index signal follows its position. Equal items in one
/// input are rejected with [`RenderError::DuplicateItem`].
pub struct For<T: 'static> {
    each: Each<T>,
    children: Row<T>,
    fallback: Option<Element>,
}

impl<T> For<T>
where
    T: Clone + Eq + Hash + Debug + 'static,
{
    pub fn new<E: Into<Element>>(
        each: impl Into<Each<T>>,
        children: impl Fn(T, State<usize>) -> E + 'static,
    ) -> Self {
        Self {
            each: each.into(),
            children: Rc::new(move |item, index| children(item, index).into()),
            fallback: None,
        }
    }

    /// Rendered in place of the list while it is empty.
    pub fn fallback(mut self, fallback: impl Into<Element>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

struct ForEntry<T> {
    item: T,
    index: State<usize>,
    marker: Node,
    disposer: Disposer,
}

struct ForList<T: 'static> {
    marker: Node,
    entries: Vec<Rc<ForEntry<T>>>,
    by_item: IndexMap<T, Rc<ForEntry<T>>>,
    boundaries: HashSet<NodeId>,
    fallback: Option<Disposer>,
    children: Row<T>,
    fallback_element: Option<Element>,
    verbose_markers: bool,
}

impl<T> ForList<T>
where
    T: Clone + Eq + Hash + Debug + 'static,
{
    fn new(marker: Node, children: Row<T>, fallback: Option<Element>) -> Self {
        let mut boundaries = HashSet::new();
        boundaries.insert(marker.id());
        Self {
            marker,
            entries: Vec::new(),
            by_item: IndexMap::new(),
            boundaries,
            fallback: None,
            children,
            fallback_element: fallback,
            verbose_markers: scheduler::config().verbose_markers,
        }
    }

    /// The entry's marker and every node up to the next boundary.
    fn span(&self, entry: &ForEntry<T>) -> Vec<Node> {
        self.span_from(&entry.marker)
    }

    fn span_from(&self, marker: &Node) -> Vec<Node> {
        let mut nodes = vec![marker.clone()];
        nodes.extend(
            marker
                .following_siblings()
                .into_iter()
                .take_while(|node| !self.boundaries.contains(&node.id())),
        );
        nodes
    }

    fn move_before(&self, entry: &ForEntry<T>, next: &Node) -> Result<()> {
        let Some(parent) = next.parent() else {
            trace!(item = ?entry.item, "list detached, skipping move");
            return Ok(());
        };
        for node in self.span(entry) {
            parent.insert_before(&node, Some(next))?;
        }
        Ok(())
    }

    fn evict(&mut self, entry: &ForEntry<T>) {
        entry.disposer.dispose();
        for node in self.span(entry) {
            node.remove();
        }
        self.boundaries.remove(&entry.marker.id());
    }

    fn create_entry(&mut self, item: &T, position: usize, next: &Node) -> Result<Rc<ForEntry<T>>> {
        let label = if self.verbose_markers {
            format!("for-item: {item:?}")
        } else {
            String::from("for-item")
        };
        let marker = Node::comment(label);
        if let Some(parent) = next.parent() {
            parent.insert_before(&marker, Some(next))?;
        }
        self.boundaries.insert(marker.id());

        let index = State::new(position);
        let element = (self.children)(item.clone(), index.clone());
        let next = next.clone();
        let target = Target::new(move |node| {
            if let Some(parent) = next.parent() {
                parent.insert_before(node, Some(&next))?;
            }
            Ok(())
        });
        let (disposer, rendered) = with_scope(|| render_element(&target, &element));
        if let Err(err) = rendered {
            disposer.dispose();
            for node in self.span_from(&marker) {
                node.remove();
            }
            self.boundaries.remove(&marker.id());
            return Err(err);
        }

        let entry = Rc::new(ForEntry {
            item: item.clone(),
            index,
            marker,
            disposer,
        });
        self.by_item.insert(item.clone(), entry.clone());
        Ok(entry)
    }

    fn reconcile(&mut self, items: &[T]) -> Result<()> {
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(duplicate) = items.iter().find(|item| !seen.insert(*item)) {
            return Err(RenderError::DuplicateItem(format!("{duplicate:?}")));
        }

        if let Some(fallback) = self.fallback.take() {
            fallback.dispose();
        }

        let mut removed: IndexSet<T> = IndexSet::new();
        let walked = self.walk(items, &mut removed);

        // Evict displaced entries even if the walk failed.
        let evicted = removed.len();
        for item in removed {
            if let Some(entry) = self.by_item.shift_remove(&item) {
                self.evict(&entry);
            }
        }
        let created = walked?;

        if items.is_empty() {
            if let Some(fallback) = &self.fallback_element {
                self.fallback = Some(render_with_cleanup(&Target::before(&self.marker), fallback)?);
            }
        }

        trace!(len = items.len(), created, evicted, "reconciled keyed list");
        Ok(())
    }

    /// Bring `entries` into the order of `items`, collecting entries that
    /// fell out of the list into `removed`. Returns how many were created.
    fn walk(&mut self, items: &[T], removed: &mut IndexSet<T>) -> Result<usize> {
        let mut created = 0;

        for (i, item) in items.iter().enumerate() {
            let next = self
                .entries
                .get(i)
                .map_or_else(|| self.marker.clone(), |entry| entry.marker.clone());

            let Some(entry) = self.by_item.get(item).cloned() else {
                let entry = self.create_entry(item, i, &next)?;
                self.entries.insert(i, entry);
                created += 1;
                continue;
            };

            entry.index.set(i);

            if removed.shift_remove(item) {
                self.move_before(&entry, &next)?;
                self.entries.insert(i, entry);
                continue;
            }

            loop {
                match self.entries.get(i) {
                    Some(current) if Rc::ptr_eq(current, &entry) => break,
                    Some(_) => {
                        let displaced = self.entries.remove(i);
                        removed.insert(displaced.item.clone());
                    }
                    // Unreachable: duplicates are rejected before the walk.
                    None => return Err(RenderError::DuplicateItem(format!("{item:?}"))),
                }
            }
        }

        while self.entries.len() > items.len() {
            if let Some(displaced) = self.entries.pop() {
                removed.insert(displaced.item.clone());
            }
        }

        Ok(created)
    }

    fn clear(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            fallback.dispose();
        }
        self.entries.clear();
        for (_, entry) in mem::take(&mut self.by_item) {
            self.evict(&entry);
        }
    }
}

impl<T> Mount for For<T>
where
    T: Clone + Eq + Hash + Debug + 'static,
{
    fn mount(&self, target: &Target) -> Result<()> {
        let marker = Node::comment("for");
        let list = Rc::new(RefCell::new(ForList::new(
            marker.clone(),
            self.children.clone(),
            self.fallback.clone(),
        )));
        // Registered before the marker is inserted, so entries are evicted
        // while the marker still ends the last span.
        {
            let list = list.clone();
            on_cleanup(move || list.borrow_mut().clear())?;
        }
        target.insert(&marker)?;

        let each = self.each.clone();
        create_render_effect(move || {
            let items = each.get();
            untrack(|| list.borrow_mut().reconcile(&items))
        })
    }
}

impl<T> From<For<T>> for Element
where
    T: Clone + Eq + Hash + Debug + 'static,
{
    fn from(list: For<T>) -> Self {
        Element::For(Rc::new(list))
    }
}

impl<T> From<For<T>> for Child
where
    T: Clone + Eq + Hash + Debug + 'static,
{
    fn from(list: For<T>) -> Self {
        Child::Element(list.into())
    }
}
