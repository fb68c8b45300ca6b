//! A small todo application driven entirely through DOM events.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use filament_core::dom::Node;
use filament_core::element::{component, create_element, fragment, Props};
use filament_core::reactive::{Computed, State};
use filament_core::{create_effect, render, run_microtasks, Child, Disposer, Element, For, Show};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
struct Todo {
    title: String,
    done: bool,
}

impl Todo {
    fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            done: false,
        }
    }
}

struct App {
    title: State<String>,
    todos: State<Vec<Todo>>,
    saved: State<String>,
}

impl App {
    fn new() -> Self {
        Self {
            title: State::new(String::new()),
            todos: State::new(Vec::new()),
            saved: State::new(String::new()),
        }
    }

    fn view(&self, reset: impl Fn() + 'static) -> Element {
        let (title, todos, saved) = (self.title.clone(), self.todos.clone(), self.saved.clone());
        let reset = Rc::new(reset);
        component(move || {
            {
                let (todos, saved) = (todos.clone(), saved.clone());
                create_effect(move || {
                    let json = serde_json::to_string(&todos.get()).unwrap_or_default();
                    saved.set(json);
                })?;
            }

            let length = {
                let todos = todos.clone();
                Computed::new(move || todos.with(Vec::len))
            };
            let is_empty = {
                let todos = todos.clone();
                Computed::new(move || todos.with(Vec::is_empty))
            };

            let form = {
                let (title, todos) = (title.clone(), todos.clone());
                let input_title = title.clone();
                create_element(
                    "form",
                    Props::new()
                        .on("submit", move |event| {
                            event.prevent_default();
                            let next = Todo::new(&title.get());
                            todos.update(|todos| {
                                let mut todos = todos.clone();
                                todos.push(next);
                                todos
                            });
                            title.set(String::new());
                        })
                        .child(create_element(
                            "input",
                            Props::new()
                                .prop("placeholder", "enter todo and click +")
                                .prop("value", input_title.clone())
                                .on("input", move |event| {
                                    let value = event.current_target().property("value");
                                    if let Some(Value::String(value)) = value {
                                        input_title.set(value);
                                    }
                                }),
                        ))
                        .child(create_element("button", Props::new().child("+"))),
                )
            };

            let rows: Element = {
                let todos = todos.clone();
                For::new(todos.clone(), move |todo: Todo, index: State<usize>| {
                    row(&todos, todo, index)
                })
                .into()
            };

            let reset = reset.clone();
            Ok(fragment([
                Child::from(create_element("h3", Props::new().child("Simple Todos Example"))),
                Child::from(form),
                Child::from(create_element("p", Props::new().child(length).child(" Todos:"))),
                Child::from(Show::new(is_empty, create_element("p", Props::new().child("No Todos yet")))),
                Child::from(rows),
                Child::from(create_element(
                    "button",
                    Props::new()
                        .prop("id", "reset")
                        .on("click", move |_| reset())
                        .child("reset"),
                )),
            ]))
        })
    }
}

fn change(todos: &State<Vec<Todo>>, f: impl FnOnce(&mut Vec<Todo>)) {
    let mut next = todos.get_untracked();
    f(&mut next);
    todos.set(next);
}

fn row(todos: &State<Vec<Todo>>, todo: Todo, index: State<usize>) -> Element {
    let toggle = {
        let (todos, index) = (todos.clone(), index.clone());
        move |event: &filament_core::dom::Event| {
            let done = event.current_target().property("checked") == Some(Value::Bool(true));
            change(&todos, |todos| todos[index.get()].done = done);
        }
    };
    let remove = {
        let todos = todos.clone();
        move |_: &filament_core::dom::Event| {
            change(&todos, |todos| {
                todos.remove(index.get());
            });
        }
    };

    create_element(
        "div",
        Props::new()
            .child(create_element(
                "input",
                Props::new()
                    .prop("type", "checkbox")
                    .prop("checked", todo.done)
                    .on("change", toggle),
            ))
            .child(create_element(
                "input",
                Props::new().prop("type", "text").prop("value", todo.title.as_str()),
            ))
            .child(create_element("button", Props::new().on("click", remove).child("x"))),
    )
}

fn find(root: &Node, tag: &str) -> Vec<Node> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if node.tag() == Some(tag) {
            found.push(node.clone());
        }
        stack.extend(node.children().into_iter().rev());
    }
    found
}

fn rows(root: &Node) -> Vec<Node> {
    find(root, "div")
}

fn add(root: &Node, title: &str) {
    let input = find(root, "input")[0].clone();
    input.set_property("value", title).unwrap();
    input.dispatch_event("input");
    let submit = find(root, "form")[0].dispatch_event("submit");
    assert!(submit.default_prevented());
    run_microtasks().unwrap();
}

#[test]
fn adds_toggles_and_removes_todos() {
    let body = Node::element("body");
    let app = App::new();
    let _dispose = render(&body, &app.view(|| {})).unwrap();

    assert!(body.text_content().contains("0 Todos:"));
    assert!(body.text_content().contains("No Todos yet"));

    add(&body, "milk");
    add(&body, "eggs");
    assert!(body.text_content().contains("2 Todos:"));
    assert!(!body.text_content().contains("No Todos yet"));
    assert_eq!(rows(&body).len(), 2);
    assert_eq!(find(&body, "input")[0].property("value"), Some(Value::from("")));

    let eggs = rows(&body)[1].clone();
    let checkbox = find(&rows(&body)[0], "input")[0].clone();
    checkbox.set_property("checked", true).unwrap();
    checkbox.dispatch_event("change");
    run_microtasks().unwrap();

    assert_eq!(
        app.todos.get(),
        vec![
            Todo { title: "milk".into(), done: true },
            Todo::new("eggs"),
        ]
    );
    assert!(rows(&body)[1].ptr_eq(&eggs));
    assert!(app.saved.get().contains(r#"{"title":"milk","done":true}"#));

    let remove_milk = find(&rows(&body)[0], "button")[0].clone();
    remove_milk.dispatch_event("click");
    run_microtasks().unwrap();

    assert_eq!(app.todos.get(), vec![Todo::new("eggs")]);
    assert_eq!(rows(&body).len(), 1);
    assert!(rows(&body)[0].ptr_eq(&eggs));
    assert!(body.text_content().contains("1 Todos:"));
}

#[test]
fn removing_a_row_reindexes_the_rest() {
    let body = Node::element("body");
    let app = App::new();
    let _dispose = render(&body, &app.view(|| {})).unwrap();
    for title in ["a", "b", "c"] {
        add(&body, title);
    }

    find(&rows(&body)[0], "button")[0].dispatch_event("click");
    run_microtasks().unwrap();

    find(&rows(&body)[1], "button")[0].dispatch_event("click");
    run_microtasks().unwrap();

    assert_eq!(app.todos.get(), vec![Todo::new("b")]);
}

#[test]
fn app_can_dispose_itself_from_a_listener() {
    let body = Node::element("body");
    let app = App::new();
    let handle: Rc<RefCell<Option<Disposer>>> = Rc::default();

    let view = {
        let handle = handle.clone();
        app.view(move || {
            if let Some(dispose) = handle.borrow_mut().take() {
                dispose.dispose();
            }
        })
    };
    *handle.borrow_mut() = Some(render(&body, &view).unwrap());
    add(&body, "milk");

    let reset = find(&body, "button")
        .into_iter()
        .find(|button| button.property("id") == Some(Value::from("reset")))
        .unwrap();
    reset.dispatch_event("click");
    run_microtasks().unwrap();

    assert_eq!(body.child_count(), 0);
    assert!(handle.borrow().is_none());

    app.todos.set(vec![Todo::new("ignored")]);
    run_microtasks().unwrap();
    assert_eq!(body.child_count(), 0);
    assert_eq!(app.todos.subscriber_count(), 0);
}
