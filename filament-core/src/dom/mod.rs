//! In-memory DOM
//!
//! A small single-threaded document model with the operations the renderer
//! needs: node creation, insertion, removal, property assignment and event
//! listeners. It behaves like the browser DOM where the renderer can observe
//! a difference; most importantly, inserting a node that already has a
//! parent moves it.
//!
//! Element properties are JSON values, assigned as-is (`element[key] =
//! value`), so `checked` stays a boolean and `value` stays a string.

mod event;
mod html;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

pub use event::{Event, Listener};
pub use html::NodeSnapshot;

/// Errors raised by DOM operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// Only elements can have children, properties or listeners.
    #[error("{0} nodes cannot contain children or properties")]
    NotAContainer(String),

    /// The reference node is not a child of the parent.
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Inserting the node would make it its own ancestor.
    #[error("inserting node {0} here would create a cycle")]
    HierarchyRequest(NodeId),
}

/// Unique identifier for a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
}

enum Content {
    Element {
        tag: String,
        properties: RefCell<IndexMap<String, Value>>,
        listeners: RefCell<Vec<(String, Listener)>>,
    },
    Text(RefCell<String>),
    Comment(RefCell<String>),
}

struct NodeData {
    id: NodeId,
    content: Content,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
}

/// A handle to a DOM node. Clones refer to the same node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    fn with_content(content: Content) -> Self {
        Self(Rc::new(NodeData {
            id: NodeId::new(),
            content,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create an element, like `document.createElement(tag)`.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_content(Content::Element {
            tag: tag.into(),
            properties: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Create a text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self::with_content(Content::Text(RefCell::new(data.into())))
    }

    /// Create a comment node.
    pub fn comment(data: impl Into<String>) -> Self {
        Self::with_content(Content::Comment(RefCell::new(data.into())))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn node_type(&self) -> NodeType {
        match self.0.content {
            Content::Element { .. } => NodeType::Element,
            Content::Text(_) => NodeType::Text,
            Content::Comment(_) => NodeType::Comment,
        }
    }

    /// Tag name, for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.content {
            Content::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn kind_name(&self) -> String {
        match &self.0.content {
            Content::Element { tag, .. } => tag.clone(),
            Content::Text(_) => "#text".into(),
            Content::Comment(_) => "#comment".into(),
        }
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    fn position_in_parent(&self) -> Option<(Node, usize)> {
        let parent = self.parent()?;
        let position = parent
            .0
            .children
            .borrow()
            .iter()
            .position(|child| child.ptr_eq(self))?;
        Some((parent, position))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let (parent, position) = self.position_in_parent()?;
        let next = parent.0.children.borrow().get(position + 1).cloned();
        next
    }

    /// Siblings after this node, in document order.
    pub fn following_siblings(&self) -> Vec<Node> {
        match self.position_in_parent() {
            Some((parent, position)) => parent.0.children.borrow()[position + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    fn is_inclusive_ancestor_of(&self, node: &Node) -> bool {
        let mut cursor = Some(node.clone());
        while let Some(current) = cursor {
            if current.ptr_eq(self) {
                return true;
            }
            cursor = current.parent();
        }
        false
    }

    fn ensure_container(&self) -> Result<(), DomError> {
        match self.0.content {
            Content::Element { .. } => Ok(()),
            _ => Err(DomError::NotAContainer(self.kind_name())),
        }
    }

    /// Append `child` as the last child, moving it if it is attached
    /// elsewhere.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None`. A child that already has a parent is moved.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        self.ensure_container()?;
        if child.is_inclusive_ancestor_of(self) {
            return Err(DomError::HierarchyRequest(child.id()));
        }
        if let Some(reference) = reference {
            if !reference.parent().is_some_and(|parent| parent.ptr_eq(self)) {
                return Err(DomError::NotAChild {
                    parent: self.id(),
                    child: reference.id(),
                });
            }
            if reference.ptr_eq(child) {
                return Ok(());
            }
        }

        child.remove();

        let mut children = self.0.children.borrow_mut();
        let position = reference
            .and_then(|reference| children.iter().position(|c| c.ptr_eq(reference)))
            .unwrap_or(children.len());
        children.insert(position, child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        Ok(())
    }

    /// Remove `child` from this node.
    pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
        let position = self
            .0
            .children
            .borrow()
            .iter()
            .position(|c| c.ptr_eq(child))
            .ok_or(DomError::NotAChild {
                parent: self.id(),
                child: child.id(),
            })?;
        let removed = self.0.children.borrow_mut().remove(position);
        *removed.0.parent.borrow_mut() = Weak::new();
        Ok(removed)
    }

    /// Detach this node from its parent. Returns whether it was attached.
    pub fn remove(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self).is_ok(),
            None => false,
        }
    }

    /// Assign a property, like `element[name] = value`.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<(), DomError> {
        match &self.0.content {
            Content::Element { properties, .. } => {
                properties.borrow_mut().insert(name.to_owned(), value.into());
                Ok(())
            }
            _ => Err(DomError::NotAContainer(self.kind_name())),
        }
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        match &self.0.content {
            Content::Element { properties, .. } => properties.borrow().get(name).cloned(),
            _ => None,
        }
    }

    /// All properties, in assignment order.
    pub fn properties(&self) -> Vec<(String, Value)> {
        match &self.0.content {
            Content::Element { properties, .. } => properties
                .borrow()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Set the text content. Elements have their children replaced by a
    /// single text node.
    pub fn set_text(&self, data: impl Into<String>) {
        match &self.0.content {
            Content::Text(text) | Content::Comment(text) => *text.borrow_mut() = data.into(),
            Content::Element { .. } => {
                for child in self.children() {
                    child.remove();
                }
                let data = data.into();
                if !data.is_empty() {
                    let text = Node::text(data);
                    *text.0.parent.borrow_mut() = Rc::downgrade(&self.0);
                    self.0.children.borrow_mut().push(text);
                }
            }
        }
    }

    /// Concatenated text of this node and its descendants. Comments
    /// contribute only when asked for directly.
    pub fn text_content(&self) -> String {
        match &self.0.content {
            Content::Text(text) | Content::Comment(text) => text.borrow().clone(),
            Content::Element { .. } => {
                let mut out = String::new();
                self.collect_text(&mut out);
                out
            }
        }
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.0.children.borrow().iter() {
            match &child.0.content {
                Content::Text(text) => out.push_str(&text.borrow()),
                Content::Comment(_) => {}
                Content::Element { .. } => child.collect_text(out),
            }
        }
    }

    pub fn add_event_listener(
        &self,
        kind: &str,
        listener: impl Fn(&Event) + 'static,
    ) -> Result<(), DomError> {
        match &self.0.content {
            Content::Element { listeners, .. } => {
                listeners.borrow_mut().push((kind.to_owned(), Rc::new(listener)));
                Ok(())
            }
            _ => Err(DomError::NotAContainer(self.kind_name())),
        }
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        match &self.0.content {
            Content::Element { listeners, .. } => {
                listeners.borrow().iter().filter(|(k, _)| k == kind).count()
            }
            _ => 0,
        }
    }

    fn listeners_for(&self, kind: &str) -> Vec<Listener> {
        match &self.0.content {
            Content::Element { listeners, .. } => listeners
                .borrow()
                .iter()
                .filter(|(k, _)| k == kind)
                .map(|(_, listener)| listener.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Dispatch an event of type `kind` at this node and bubble it up.
    ///
    /// Listeners may mutate the tree, including detaching this node.
    pub fn dispatch_event(&self, kind: &str) -> Event {
        trace!(node = %self.id(), kind, "dispatching event");
        let event = Event::new(kind, self.clone());
        let mut path = Vec::new();
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            cursor = node.parent();
            path.push(node);
        }

        for node in path {
            event.set_current_target(&node);
            for listener in node.listeners_for(kind) {
                listener(&event);
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("kind", &self.kind_name())
            .field("children", &self.child_count())
            .finish()
    }
}
