//! Load-time and render-time error types.

use crate::{cache::CacheError, filters::FilterError, minify::MinifyError, template::Category};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the template directory.
///
/// Any of these aborts the whole load; no partial registries are kept.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to walk template directory `{0}`")]
    Walk(PathBuf, #[source] walkdir::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("syntax error in the {category} '{name}': front matter or content is missing")]
    MissingDelimiter { category: Category, name: String },

    #[error("syntax error in the {category} '{name}': front matter delimiter appears {count} times")]
    DuplicateDelimiter {
        category: Category,
        name: String,
        count: usize,
    },

    #[error("syntax error in the {category} '{name}': front matter ({source})")]
    FrontMatter {
        category: Category,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("syntax error in the {category} '{name}': content ({source})")]
    Content {
        category: Category,
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Errors raised by a single render call.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{category} with name '{name}' could not be found")]
    NotFound { category: Category, name: String },

    #[error("in the page '{page}' layout with name '{layout}' could not be found")]
    LayoutNotFound { page: String, layout: String },

    #[error("template execution failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Minify(#[from] MinifyError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to write rendered output")]
    Io(#[from] std::io::Error),
}
