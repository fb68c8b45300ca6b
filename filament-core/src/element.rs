//! Element descriptors.
//!
//! An [`Element`] is an immutable description of what to mount. Building one
//! has no side effects; nothing touches the DOM until it is passed to
//! [`crate::render`].
//!
//! # Example
//!
//! ```rust
//! use filament_core::element::{create_element, Props};
//! use filament_core::reactive::State;
//!
//! let name = State::new(String::from("world"));
//! let greeting = create_element(
//!     "p",
//!     Props::new()
//!         .prop("class", "greeting")
//!         .child("hello, ")
//!         .child(name.clone()),
//! );
//! # let _ = greeting;
//! ```

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::Event;
use crate::error::Result;
use crate::reactive::{Computed, State};
use crate::render::Mount;

/// An event handler attached with an `on:` prop.
pub type Handler = Rc<dyn Fn(&Event)>;

/// The value of one prop.
#[derive(Clone)]
pub enum Prop {
    /// Assigned once when the element is created.
    Value(Value),
    /// Re-assigned by an effect whenever the signals it reads change.
    Reactive(Rc<dyn Fn() -> Value>),
    /// Installed as an event listener.
    Handler(Handler),
}

impl Prop {
    /// A prop recomputed from whatever signals `f` reads.
    pub fn reactive<V: Into<Value>>(f: impl Fn() -> V + 'static) -> Self {
        Prop::Reactive(Rc::new(move || f().into()))
    }

    /// An event handler prop.
    pub fn handler(f: impl Fn(&Event) + 'static) -> Self {
        Prop::Handler(Rc::new(f))
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Prop::Reactive(_) => f.write_str("Reactive(..)"),
            Prop::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Conversion into a [`Prop`].
pub trait IntoProp {
    fn into_prop(self) -> Prop;
}

macro_rules! impl_into_prop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoProp for $ty {
                fn into_prop(self) -> Prop {
                    Prop::Value(Value::from(self))
                }
            }
        )*
    };
}

impl_into_prop!(&str, String, bool, i32, i64, u32, u64, usize, f64, Value);

impl IntoProp for Prop {
    fn into_prop(self) -> Prop {
        self
    }
}

impl<T> IntoProp for State<T>
where
    T: Into<Value> + Clone + 'static,
{
    fn into_prop(self) -> Prop {
        Prop::reactive(move || self.get())
    }
}

impl<T> IntoProp for Computed<T>
where
    T: Into<Value> + Clone + PartialEq + 'static,
{
    fn into_prop(self) -> Prop {
        Prop::reactive(move || self.get())
    }
}

/// Props of an intrinsic element, in declaration order.
#[derive(Clone, Default)]
pub struct Props {
    entries: Vec<(String, Prop)>,
    children: Vec<Child>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prop. Keys with a `:` are namespaced; only `on:` is understood.
    pub fn prop(mut self, name: impl Into<String>, value: impl IntoProp) -> Self {
        self.entries.push((name.into(), value.into_prop()));
        self
    }

    /// Add an event handler under `on:<event>`.
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.prop(format!("on:{event}"), Prop::handler(handler))
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn entries(&self) -> &[(String, Prop)] {
        &self.entries
    }

    pub fn child_list(&self) -> &[Child] {
        &self.children
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("entries", &self.entries)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Child content of an element.
#[derive(Clone)]
pub enum Child {
    /// A static text node.
    Text(String),
    /// A text node kept in sync with the signals the closure reads.
    Reactive(Rc<dyn Fn() -> String>),
    /// A nested element.
    Element(Element),
}

impl Child {
    /// Reactive text computed by `f`.
    pub fn reactive<D: fmt::Display>(f: impl Fn() -> D + 'static) -> Self {
        Child::Reactive(Rc::new(move || f().to_string()))
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Child::Reactive(_) => f.write_str("Reactive(..)"),
            Child::Element(element) => f.debug_tuple("Element").field(element).finish(),
        }
    }
}

macro_rules! impl_text_child {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

impl_text_child!(&str, String, &String, char, i32, i64, u32, u64, usize, f64);

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl<C: Into<Child>> From<Vec<C>> for Child {
    fn from(children: Vec<C>) -> Self {
        Child::Element(fragment(children))
    }
}

impl<T> From<State<T>> for Child
where
    T: fmt::Display + Clone + 'static,
{
    fn from(state: State<T>) -> Self {
        Child::reactive(move || state.get())
    }
}

impl<T> From<Computed<T>> for Child
where
    T: fmt::Display + Clone + PartialEq + 'static,
{
    fn from(computed: Computed<T>) -> Self {
        Child::reactive(move || computed.get())
    }
}

/// An element with a tag name, like `div`.
#[derive(Debug, Clone)]
pub struct Intrinsic {
    pub tag: String,
    pub props: Props,
}

/// A render function. Props are whatever the closure captured.
#[derive(Clone)]
pub struct Component(Rc<dyn Fn() -> Result<Element>>);

impl Component {
    pub fn new(render: impl Fn() -> Result<Element> + 'static) -> Self {
        Self(Rc::new(render))
    }

    pub fn call(&self) -> Result<Element> {
        (self.0)()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component(..)")
    }
}

/// A descriptor of something to mount.
#[derive(Clone)]
pub enum Element {
    Intrinsic(Intrinsic),
    Component(Component),
    Fragment(Vec<Child>),
    Show(Rc<dyn Mount>),
    For(Rc<dyn Mount>),
    Index(Rc<dyn Mount>),
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Intrinsic(intrinsic) => intrinsic.fmt(f),
            Element::Component(component) => component.fmt(f),
            Element::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Element::Show(_) => f.write_str("Show(..)"),
            Element::For(_) => f.write_str("For(..)"),
            Element::Index(_) => f.write_str("Index(..)"),
        }
    }
}

impl From<Child> for Element {
    fn from(child: Child) -> Self {
        match child {
            Child::Element(element) => element,
            other => Element::Fragment(vec![other]),
        }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::Fragment(vec![Child::from(text)])
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Fragment(vec![Child::Text(text)])
    }
}

impl From<Intrinsic> for Element {
    fn from(intrinsic: Intrinsic) -> Self {
        Element::Intrinsic(intrinsic)
    }
}

impl From<Component> for Element {
    fn from(component: Component) -> Self {
        Element::Component(component)
    }
}

/// Describe an intrinsic element.
pub fn create_element(tag: impl Into<String>, props: Props) -> Element {
    Element::Intrinsic(Intrinsic {
        tag: tag.into(),
        props,
    })
}

/// Group children without a wrapping element.
pub fn fragment<I>(children: I) -> Element
where
    I: IntoIterator,
    I::Item: Into<Child>,
{
    Element::Fragment(children.into_iter().map(Into::into).collect())
}

/// Describe a component invocation.
pub fn component(render: impl Fn() -> Result<Element> + 'static) -> Element {
    Element::Component(Component::new(render))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_keep_declaration_order() {
        let props = Props::new()
            .prop("id", "main")
            .on("click", |_| {})
            .prop("tabIndex", 3)
            .child("a")
            .children([1, 2]);

        let keys: Vec<&str> = props.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["id", "on:click", "tabIndex"]);
        assert!(matches!(props.entries()[1].1, Prop::Handler(_)));
        assert_eq!(props.child_list().len(), 3);
    }

    #[test]
    fn signals_become_reactive_props_and_children() {
        let count = State::new(4);
        assert!(matches!(count.clone().into_prop(), Prop::Reactive(_)));

        let Child::Reactive(text) = Child::from(count.clone()) else {
            panic!("expected reactive text");
        };
        assert_eq!(text(), "4");
        count.set(5);
        assert_eq!(text(), "5");
    }

    #[test]
    fn plain_values_are_json() {
        let Prop::Value(value) = true.into_prop() else {
            panic!("expected value");
        };
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn text_child_converts_to_fragment() {
        match Element::from("hi") {
            Element::Fragment(children) => assert!(matches!(&children[0], Child::Text(t) if t == "hi")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
