//! Template entities: blocks, partials, layouts and pages.
//!
//! Every entity wraps a compiled [`Body`]. The body itself lives in the
//! shared template environment under its identifier, which is what lets
//! templates `{% include "partials/nav" %}` one another.
//!
//! | Category  | Prefix      | Front matter | Injects  |
//! |-----------|-------------|--------------|----------|
//! | `Block`   | `blocks/`   | no           | -        |
//! | `Partial` | `partials/` | no           | -        |
//! | `Layout`  | `layouts/`  | yes          | `layout` |
//! | `Page`    | `pages/`    | yes          | `page`   |

mod block;
pub mod front_matter;
mod layout;
mod page;
mod partial;

pub use block::Block;
pub use layout::Layout;
pub use page::{Page, PageMeta};
pub use partial::Partial;

use crate::{
    error::{LoadError, RenderError},
    minify::{HTML_MIME, minify},
    scope::Scope,
};
use minijinja::Environment;
use std::{fmt, io::Write};

// ============================================================================
// Constants
// ============================================================================

/// File extension of template files.
pub const EXTENSION: &str = ".htm";

pub const BLOCKS_PREFIX: &str = "blocks/";
pub const PARTIALS_PREFIX: &str = "partials/";
pub const LAYOUTS_PREFIX: &str = "layouts/";
pub const PAGES_PREFIX: &str = "pages/";

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_LAYOUT: &str = "default";
pub const DEFAULT_ROBOTS_INDEX: bool = false;
pub const DEFAULT_ROBOTS_FOLLOW: bool = false;

/// Scope keys injected during composition.
pub const PAGE_KEY: &str = "page";
pub const LAYOUT_KEY: &str = "layout";
pub const EMBED_KEY: &str = "embed";
pub const LOCALE_KEY: &str = "locale";

// ============================================================================
// Category
// ============================================================================

/// Template category, selected purely by identifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Block,
    Partial,
    Layout,
    Page,
}

impl Category {
    /// All categories in classification order.
    pub const ALL: [Self; 4] = [Self::Block, Self::Partial, Self::Layout, Self::Page];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Block => BLOCKS_PREFIX,
            Self::Partial => PARTIALS_PREFIX,
            Self::Layout => LAYOUTS_PREFIX,
            Self::Page => PAGES_PREFIX,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Partial => "partial",
            Self::Layout => "layout",
            Self::Page => "page",
        }
    }

    /// First category whose prefix `identifier` starts with.
    pub fn classify(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| identifier.starts_with(category.prefix()))
    }

    /// Identifier with this category's prefix removed.
    pub fn bare(self, identifier: &str) -> &str {
        identifier
            .strip_prefix(self.prefix())
            .unwrap_or(identifier)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Body
// ============================================================================

/// Handle to a compiled template body plus its minify setting.
#[derive(Debug, Clone)]
pub struct Body {
    id: String,
    minify: bool,
}

impl Body {
    /// Compile `source` into `env` under `id`.
    pub(crate) fn compile(
        env: &mut Environment<'static>,
        category: Category,
        id: &str,
        source: String,
        minify: bool,
    ) -> Result<Self, LoadError> {
        env.add_template_owned(id.to_owned(), source)
            .map_err(|source| LoadError::Content {
                category,
                name: category.bare(id).to_owned(),
                source,
            })?;
        Ok(Self {
            id: id.to_owned(),
            minify,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn minify(&self) -> bool {
        self.minify
    }

    /// Render honoring the minify flag.
    ///
    /// With minification the output is buffered and written in one go.
    /// Without it the engine streams straight into `out`, so a failure
    /// midway may leave partial output behind in `out`.
    pub(crate) fn render(
        &self,
        env: &Environment<'static>,
        out: &mut dyn Write,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        if !self.minify {
            return self.stream(env, out, scope);
        }

        let mut buf = Vec::new();
        self.stream(env, &mut buf, scope)?;
        out.write_all(&minify(HTML_MIME, &buf)?)?;
        Ok(())
    }

    /// Render straight into `out`, never minifying.
    pub(crate) fn stream(
        &self,
        env: &Environment<'static>,
        out: &mut dyn Write,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        env.get_template(&self.id)?
            .render_captured_to(scope.to_value(), out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Category::classify("blocks/hero"), Some(Category::Block));
        assert_eq!(Category::classify("partials/nav"), Some(Category::Partial));
        assert_eq!(Category::classify("layouts/default"), Some(Category::Layout));
        assert_eq!(Category::classify("pages/blog/post"), Some(Category::Page));
        assert_eq!(Category::classify("emails/welcome"), None);
        assert_eq!(Category::classify("page/home"), None);
        assert_eq!(Category::classify(""), None);
    }

    #[test]
    fn test_bare() {
        assert_eq!(Category::Page.bare("pages/blog/post"), "blog/post");
        assert_eq!(Category::Layout.bare("layouts/default"), "default");
        assert_eq!(Category::Block.bare("other"), "other");
    }

    #[test]
    fn test_prefixes_are_mutually_exclusive() {
        for a in Category::ALL {
            for b in Category::ALL {
                if a != b {
                    assert!(!a.prefix().starts_with(b.prefix()));
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Category::Partial.to_string(), "partial");
    }

    #[test]
    fn test_body_stream_and_minify() {
        let mut env = Environment::new();
        let plain = Body::compile(&mut env, Category::Block, "blocks/a", "<p>\n  {{ x }}\n</p>".into(), false).unwrap();
        let small = Body::compile(&mut env, Category::Block, "blocks/b", "<p>\n  {{ x }}\n</p>".into(), true).unwrap();

        let mut vars = crate::scope::Variables::new();
        vars.insert("x".into(), "hi".into());
        let scope = Scope::new(Default::default(), vars);

        let mut a = Vec::new();
        plain.render(&env, &mut a, &scope).unwrap();
        let mut b = Vec::new();
        small.render(&env, &mut b, &scope).unwrap();

        assert_eq!(a, b"<p>\n  hi\n</p>");
        assert!(b.len() < a.len());
        assert!(String::from_utf8_lossy(&b).contains("hi"));
    }

    #[test]
    fn test_body_compile_error_names_template() {
        let mut env = Environment::new();
        let err = Body::compile(&mut env, Category::Partial, "partials/nav", "{% if %}".into(), false)
            .unwrap_err();

        assert!(matches!(
            &err,
            LoadError::Content { category: Category::Partial, name, .. } if name == "nav"
        ));
    }
}
