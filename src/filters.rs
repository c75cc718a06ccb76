//! Custom template filters.
//!
//! Filters are collected up front and installed into every freshly built
//! template environment, so reloading never trips over names that were
//! already registered by an earlier load.

use minijinja::{Environment, Error, Value, value::Rest};
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Signature of a custom filter: the piped value plus any extra arguments.
pub type FilterFn = dyn Fn(Value, Rest<Value>) -> Result<Value, Error> + Send + Sync;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter name `{0}`: must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName(String),

    #[error("filter `{0}` is already registered")]
    Duplicate(String),
}

/// Filters minijinja ships with. A custom filter may not shadow any of them.
const BUILTIN_FILTERS: &[&str] = &[
    "abs", "attr", "batch", "bool", "capitalize", "chain", "count", "d", "default", "dictsort",
    "e", "escape", "first", "float", "format", "groupby", "indent", "int", "items", "join",
    "last", "length", "lines", "list", "lower", "map", "max", "min", "pprint", "reject",
    "rejectattr", "replace", "reverse", "round", "safe", "select", "selectattr", "slice",
    "sort", "split", "string", "sum", "title", "tojson", "trim", "unique", "upper",
    "urlencode", "zip",
];

/// Named set of custom filters.
#[derive(Clone, Default)]
pub struct Filters {
    entries: Vec<(String, Arc<FilterFn>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. Names are validated when the filters are installed.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(Value, Rest<Value>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.entries.push((name.into(), Arc::new(filter)));
        self
    }

    /// Add a filter, rejecting bad or repeated names right away.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F) -> Result<(), FilterError>
    where
        F: Fn(Value, Rest<Value>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(FilterError::InvalidName(name));
        }
        if is_builtin(&name) || self.names().any(|other| other == name) {
            return Err(FilterError::Duplicate(name));
        }
        self.entries.push((name, Arc::new(filter)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Check every name, then register all filters with `env`.
    pub fn install(&self, env: &mut Environment<'static>) -> Result<(), FilterError> {
        self.validate()?;
        for (name, filter) in &self.entries {
            let filter = Arc::clone(filter);
            env.add_filter(name.clone(), move |value: Value, args: Rest<Value>| {
                filter(value, args)
            });
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), FilterError> {
        for (i, (name, _)) in self.entries.iter().enumerate() {
            if !is_identifier(name) {
                return Err(FilterError::InvalidName(name.clone()));
            }
            if is_builtin(name) || self.entries[..i].iter().any(|(other, _)| other == name) {
                return Err(FilterError::Duplicate(name.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn is_builtin(name: &str) -> bool {
    BUILTIN_FILTERS.contains(&name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
