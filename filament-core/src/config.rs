//! Runtime configuration.
//!
//! Configuration is per thread, like the scheduler that reads it. Install it
//! with [`crate::configure`] before rendering.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the scheduler and the reconcilers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Consecutive microtasks `run_microtasks` executes before giving up.
    ///
    /// Guards against effects that keep invalidating themselves.
    pub max_microtask_turns: usize,

    /// Label keyed-list entry markers with their item (`for-item: 3`).
    pub verbose_markers: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_microtask_turns: 10_000,
            verbose_markers: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderError;

    #[test]
    fn missing_fields_use_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "verbose_markers": false }"#).unwrap();
        assert!(!config.verbose_markers);
        assert_eq!(config.max_microtask_turns, 10_000);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RuntimeConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }
}
