//! Error types.
//!
//! Everything the renderer rejects is a programmer error: it is reported at
//! the point of detection and never retried. A render that fails may already
//! have inserted DOM nodes; those are not rolled back.

use thiserror::Error;

use crate::dom::DomError;

/// Errors raised while rendering or flushing effects.
#[derive(Debug, Error)]
pub enum RenderError {
    /// `on_cleanup` or `create_effect` was called outside a render.
    #[error("not in a render context")]
    NotInRenderContext,

    /// A prop key the renderer does not understand, such as `bind:value`, or
    /// a handler/value mismatch on an `on:` key.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// The same value appeared twice in a keyed list.
    #[error("duplicate for item: {0}")]
    DuplicateItem(String),

    /// The microtask queue kept rescheduling itself.
    #[error("microtask queue did not settle after {0} turns")]
    FlushLimit(usize),

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A DOM operation was rejected.
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Result alias used throughout the crate.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
