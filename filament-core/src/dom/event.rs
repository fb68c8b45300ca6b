//! DOM events.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::Node;

/// An event listener.
pub type Listener = Rc<dyn Fn(&Event)>;

/// An event being dispatched.
///
/// Events bubble from the target to the root unless a listener calls
/// [`Event::stop_propagation`].
pub struct Event {
    kind: String,
    target: Node,
    current_target: RefCell<Node>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub(crate) fn new(kind: impl Into<String>, target: Node) -> Self {
        Self {
            kind: kind.into(),
            current_target: RefCell::new(target.clone()),
            target,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Event type, e.g. `click`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> &Node {
        &self.target
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> Node {
        self.current_target.borrow().clone()
    }

    pub(crate) fn set_current_target(&self, node: &Node) {
        *self.current_target.borrow_mut() = node.clone();
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("target", &self.target.id())
            .field("default_prevented", &self.default_prevented())
            .finish()
    }
}
