//! Filament Core
//!
//! This crate provides the core runtime for the Filament UI framework, a
//! fine-grained reactive renderer. It implements:
//!
//! - Reactive primitives (state cells, computeds, watchers)
//! - A microtask-batched effect scheduler
//! - Nestable cleanup scopes
//! - A renderer that mounts element descriptors into an in-memory DOM
//! - Control flow reconcilers for conditionals and lists
//!
//! There is no virtual DOM. A signal read while rendering subscribes exactly
//! the property, text node or control flow region that read it, and a write
//! updates only that.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signal primitives and dependency tracking
//! - `scheduler`: Effect batching and the microtask queue
//! - `cleanup`: Cleanup scopes, `on_cleanup` and `create_effect`
//! - `dom`: The document model rendered into
//! - `element`: Element descriptors and their builders
//! - `render`: The renderer core
//! - `control`: `Show`, `For` and `Index`
//!
//! # Example
//!
//! ```rust
//! use filament_core::dom::Node;
//! use filament_core::element::{create_element, Props};
//! use filament_core::reactive::State;
//! use filament_core::{render, run_microtasks};
//!
//! let body = Node::element("body");
//! let count = State::new(0);
//!
//! let button = {
//!     let clicks = count.clone();
//!     create_element(
//!         "button",
//!         Props::new()
//!             .on("click", move |_| clicks.update(|n| n + 1))
//!             .child("clicked ")
//!             .child(count.clone()),
//!     )
//! };
//!
//! let dispose = render(&body, &button).unwrap();
//! body.first_child().unwrap().dispatch_event("click");
//! run_microtasks().unwrap();
//! assert_eq!(body.text_content(), "clicked 1");
//!
//! dispose.dispose();
//! assert_eq!(body.child_count(), 0);
//! ```

pub mod cleanup;
pub mod config;
pub mod control;
pub mod dom;
pub mod element;
pub mod error;
pub mod reactive;
pub mod render;
pub mod scheduler;

pub use cleanup::{create_effect, in_render_context, on_cleanup, Disposer};
pub use config::RuntimeConfig;
pub use control::{Each, For, Index, Show};
pub use element::{component, create_element, fragment, Child, Element, Props};
pub use error::{RenderError, Result};
pub use render::{render, render_with_cleanup, Target};
pub use scheduler::{config, configure, queue_microtask, run_microtasks};
