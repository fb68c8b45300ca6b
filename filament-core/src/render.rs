//! Renderer
//!
//! Walks an [`Element`] tree and mounts it into the DOM through a [`Target`].
//! Every mount runs inside a cleanup scope, so the disposer returned by
//! [`render`] removes every node and stops every effect it created.
//!
//! # Fine-grained updates
//!
//! Nothing is diffed. A prop or text child backed by a signal gets its own
//! effect that rewrites exactly that property or text node. Control flow
//! regions ([`crate::control`]) anchor themselves on comment markers and
//! update only the nodes between them.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::cleanup::{create_effect, create_render_effect, on_cleanup, with_scope, Disposer};
use crate::dom::Node;
use crate::element::{Child, Element, Intrinsic, Prop};
use crate::error::{RenderError, Result};

/// Something that knows how to mount itself at a target.
///
/// Implemented by the control flow constructors.
pub trait Mount {
    fn mount(&self, target: &Target) -> Result<()>;
}

/// Where rendered nodes go.
#[derive(Clone)]
pub struct Target(Rc<dyn Fn(&Node) -> Result<()>>);

impl Target {
    pub fn new(insert: impl Fn(&Node) -> Result<()> + 'static) -> Self {
        Self(Rc::new(insert))
    }

    /// Append to `parent`, removing the node again when the current scope
    /// is disposed.
    pub fn append_to(parent: &Node) -> Self {
        let parent = parent.clone();
        Self::new(move |node| {
            parent.append_child(node)?;
            remove_on_cleanup(node)
        })
    }

    /// Append to `parent` with no cleanup. The nodes go away with `parent`.
    pub(crate) fn children_of(parent: &Node) -> Self {
        let parent = parent.clone();
        Self::new(move |node| Ok(parent.append_child(node)?))
    }

    /// Insert before `marker`, removing the node again when the current
    /// scope is disposed. Insertions are skipped once the marker has been
    /// detached.
    pub fn before(marker: &Node) -> Self {
        let marker = marker.clone();
        Self::new(move |node| {
            let Some(parent) = marker.parent() else {
                trace!(marker = %marker.id(), "marker detached, skipping insertion");
                return Ok(());
            };
            parent.insert_before(node, Some(&marker))?;
            remove_on_cleanup(node)
        })
    }

    pub fn insert(&self, node: &Node) -> Result<()> {
        (self.0)(node)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Target(..)")
    }
}

fn remove_on_cleanup(node: &Node) -> Result<()> {
    let node = node.clone();
    on_cleanup(move || {
        node.remove();
    })
}

/// Insert a comment marker named `name` and return it with a target that
/// inserts before it.
pub(crate) fn create_marker(target: &Target, name: &str) -> Result<(Node, Target)> {
    let marker = Node::comment(name);
    target.insert(&marker)?;
    let inner = Target::before(&marker);
    Ok((marker, inner))
}

/// Mount `element` as the last children of `parent`.
///
/// The returned disposer unmounts everything.
pub fn render(parent: &Node, element: &Element) -> Result<Disposer> {
    debug!(parent = %parent.id(), "rendering root");
    render_with_cleanup(&Target::append_to(parent), element)
}

/// Mount `element` at `target` inside a fresh cleanup scope.
///
/// On failure the partial scope is dropped without running, and nodes that
/// were already inserted stay in the DOM.
pub fn render_with_cleanup(target: &Target, element: &Element) -> Result<Disposer> {
    let (disposer, result) = with_scope(|| render_element(target, element));
    result.map(|()| disposer)
}

pub(crate) fn render_element(target: &Target, element: &Element) -> Result<()> {
    match element {
        Element::Intrinsic(intrinsic) => render_intrinsic(target, intrinsic),
        Element::Component(component) => {
            let rendered = component.call()?;
            render_element(target, &rendered)
        }
        Element::Fragment(children) => render_children(target, children),
        Element::Show(show) => show.mount(target),
        Element::For(list) => list.mount(target),
        Element::Index(list) => list.mount(target),
    }
}

fn render_intrinsic(target: &Target, intrinsic: &Intrinsic) -> Result<()> {
    let element = Node::element(intrinsic.tag.as_str());
    for (key, prop) in intrinsic.props.entries() {
        apply_prop(&element, key, prop)?;
    }
    render_children(&Target::children_of(&element), intrinsic.props.child_list())?;
    target.insert(&element)
}

fn apply_prop(element: &Node, key: &str, prop: &Prop) -> Result<()> {
    if let Some((namespace, name)) = key.split_once(':') {
        return match (namespace, prop) {
            ("on", Prop::Handler(handler)) => {
                let handler = handler.clone();
                element.add_event_listener(name, move |event| handler(event))?;
                Ok(())
            }
            _ => Err(RenderError::UnknownProperty(key.to_owned())),
        };
    }

    match prop {
        Prop::Value(value) => element.set_property(key, value.clone())?,
        Prop::Reactive(read) => {
            let (element, key, read) = (element.clone(), key.to_owned(), read.clone());
            create_render_effect(move || Ok(element.set_property(&key, read())?))?;
        }
        Prop::Handler(_) => return Err(RenderError::UnknownProperty(key.to_owned())),
    }
    Ok(())
}

pub(crate) fn render_children(target: &Target, children: &[Child]) -> Result<()> {
    for child in children {
        render_child(target, child)?;
    }
    Ok(())
}

fn render_child(target: &Target, child: &Child) -> Result<()> {
    match child {
        Child::Text(text) => target.insert(&Node::text(text.as_str())),
        Child::Reactive(read) => {
            let text = Node::text("");
            target.insert(&text)?;
            let read = read.clone();
            create_effect(move || text.set_text(read()))
        }
        Child::Element(element) => render_element(target, element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{component, create_element, fragment, Props};
    use crate::reactive::State;
    use crate::scheduler::run_microtasks;
    use serde_json::Value;
    use std::cell::Cell;

    #[test]
    fn renders_intrinsic_tree() {
        let root = Node::element("body");
        let tree = create_element(
            "ul",
            Props::new()
                .prop("class", "list")
                .child(create_element("li", Props::new().child("one")))
                .child(create_element("li", Props::new().child(2))),
        );

        let dispose = render(&root, &tree).unwrap();
        assert_eq!(
            root.inner_html(),
            r#"<ul class="list"><li>one</li><li>2</li></ul>"#
        );

        dispose.dispose();
        assert_eq!(root.inner_html(), "");
    }

    #[test]
    fn reactive_prop_updates_in_place() {
        let root = Node::element("body");
        let value = State::new(String::from("a"));
        let tree = create_element("input", Props::new().prop("value", value.clone()));

        let _dispose = render(&root, &tree).unwrap();
        let input = root.first_child().unwrap();
        assert_eq!(input.property("value"), Some(Value::from("a")));

        value.set("b".into());
        run_microtasks().unwrap();
        assert!(root.first_child().unwrap().ptr_eq(&input));
        assert_eq!(input.property("value"), Some(Value::from("b")));
    }

    #[test]
    fn reactive_text_updates_in_place() {
        let root = Node::element("body");
        let count = State::new(1);
        let _dispose = render(&root, &fragment([Child::from("n="), Child::from(count.clone())])).unwrap();
        let text = root.children()[1].clone();
        assert_eq!(root.text_content(), "n=1");

        count.set(2);
        run_microtasks().unwrap();
        assert_eq!(root.text_content(), "n=2");
        assert!(root.children()[1].ptr_eq(&text));
    }

    #[test]
    fn event_props_install_listeners() {
        let root = Node::element("body");
        let clicks = Rc::new(Cell::new(0));
        let tree = {
            let clicks = clicks.clone();
            create_element(
                "button",
                Props::new().on("click", move |_| clicks.set(clicks.get() + 1)),
            )
        };

        let _dispose = render(&root, &tree).unwrap();
        root.first_child().unwrap().dispatch_event("click");
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        let root = Node::element("body");
        let tree = create_element("input", Props::new().prop("bind:value", "x"));
        let err = render(&root, &tree).unwrap_err();
        assert!(matches!(err, RenderError::UnknownProperty(key) if key == "bind:value"));
    }

    #[test]
    fn handler_without_on_is_rejected() {
        let root = Node::element("body");
        let tree = create_element("button", Props::new().prop("click", Prop::handler(|_| {})));
        assert!(matches!(
            render(&root, &tree),
            Err(RenderError::UnknownProperty(_))
        ));
    }

    #[test]
    fn components_render_in_callers_scope() {
        let root = Node::element("body");
        let cleaned = Rc::new(Cell::new(false));
        let tree = {
            let cleaned = cleaned.clone();
            component(move || {
                let cleaned = cleaned.clone();
                on_cleanup(move || cleaned.set(true))?;
                Ok(create_element("span", Props::new().child("hi")))
            })
        };

        let dispose = render(&root, &tree).unwrap();
        assert_eq!(root.inner_html(), "<span>hi</span>");
        dispose.dispose();
        assert!(cleaned.get());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn detached_marker_skips_insertion() {
        let marker = Node::comment("gone");
        let (dispose, result) = with_scope(|| Target::before(&marker).insert(&Node::text("x")));
        assert!(result.is_ok());
        assert!(dispose.is_empty());
    }
}
