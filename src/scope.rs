//! Layered variable scopes.
//!
//! A render call never mutates the variables it was given. Each stage of the
//! composition (page, layout, embed) derives a new [`Scope`] from the previous
//! one instead:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ injected (page/layout/embed) │  ← Scope::inject, highest precedence
//! ├──────────────────────────────┤
//! │ overlay (caller variables)   │  ← per render call
//! ├──────────────────────────────┤
//! │ defaults (shared, Arc)       │  ← process-wide, never written
//! └──────────────────────────────┘
//! ```

use serde_json::Value;
use std::sync::Arc;

/// Variable mapping passed to templates.
///
/// Backed by a sorted map, so its textual form is deterministic.
pub type Variables = serde_json::Map<String, Value>;

/// Immutable, layered template context.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    defaults: Arc<Variables>,
    overlay: Arc<Variables>,
    injected: Variables,
}

impl Scope {
    /// Create a scope from shared defaults and the caller's variables.
    pub fn new(defaults: Arc<Variables>, overlay: Variables) -> Self {
        Self {
            defaults,
            overlay: Arc::new(overlay),
            injected: Variables::new(),
        }
    }

    /// Derive a scope with `key` bound to `value` on top of every other layer.
    #[must_use]
    pub fn inject(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut injected = self.injected.clone();
        injected.insert(key.into(), value.into());
        Self {
            defaults: Arc::clone(&self.defaults),
            overlay: Arc::clone(&self.overlay),
            injected,
        }
    }

    /// Look up a top-level key, honoring layer precedence.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.injected
            .get(key)
            .or_else(|| self.overlay.get(key))
            .or_else(|| self.defaults.get(key))
    }

    /// Flatten all layers; later layers override earlier ones key by key.
    pub fn merged(&self) -> Variables {
        let mut merged = (*self.defaults).clone();
        merged.extend(self.overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.extend(self.injected.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Deterministic textual form of the whole scope, used for cache keys.
    pub fn fingerprint_source(&self) -> String {
        Value::Object(self.merged()).to_string()
    }

    /// Context value handed to the template engine.
    pub fn to_value(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(self.merged())
    }
}
