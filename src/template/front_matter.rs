//! Front matter splitting and parsing for layouts and pages.
//!
//! ```text
//! Title: Home
//! Layout: default
//! ==
//! <h1>{{ page.title }}</h1>
//! ```
//!
//! The delimiter is a line whose trimmed content is exactly `==`, and it must
//! appear exactly once. A `==` inside an expression such as
//! `{% if a == b %}` is not a delimiter.

use super::Category;
use crate::error::LoadError;
use serde::de::DeserializeOwned;

pub const DELIMITER: &str = "==";

/// Split `content` into trimmed `(front_matter, body)`.
pub fn split<'a>(category: Category, name: &str, content: &'a str) -> Result<(&'a str, &'a str), LoadError> {
    let mut found = None;
    let mut count = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if line.trim() == DELIMITER {
            count += 1;
            found.get_or_insert((offset, offset + line.len()));
        }
        offset += line.len();
    }

    match (count, found) {
        (1, Some((start, end))) => Ok((content[..start].trim(), content[end..].trim())),
        (0, _) => Err(LoadError::MissingDelimiter {
            category,
            name: name.to_owned(),
        }),
        (count, _) => Err(LoadError::DuplicateDelimiter {
            category,
            name: name.to_owned(),
            count,
        }),
    }
}

/// Parse YAML front matter. Empty front matter yields `T::default()`.
pub fn parse<T>(category: Category, name: &str, front_matter: &str) -> Result<T, LoadError>
where
    T: DeserializeOwned + Default,
{
    if front_matter.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(front_matter).map_err(|source| LoadError::FrontMatter {
        category,
        name: name.to_owned(),
        source,
    })
}
