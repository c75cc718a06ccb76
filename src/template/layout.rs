//! Layouts: page shells with their own declared variables.

use super::{Body, Category, LAYOUT_KEY, front_matter};
use crate::{
    error::{LoadError, RenderError},
    scope::{Scope, Variables},
};
use minijinja::Environment;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct LayoutMeta {
    variables: Variables,
}

/// A page shell. Exposes its front matter `Variables` as
/// `layout.variables` and usually splices the page in through `embed`.
#[derive(Debug, Clone)]
pub struct Layout {
    variables: Variables,
    body: Body,
}

impl Layout {
    pub(crate) fn compile(
        env: &mut Environment<'static>,
        id: &str,
        content: &str,
        minify: bool,
    ) -> Result<Self, LoadError> {
        let name = Category::Layout.bare(id);
        let (front, body) = front_matter::split(Category::Layout, name, content)?;
        let meta: LayoutMeta = front_matter::parse(Category::Layout, name, front)?;
        let body = Body::compile(env, Category::Layout, id, body.to_owned(), minify)?;

        Ok(Self {
            variables: meta.variables,
            body,
        })
    }

    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// `scope` with `layout.variables` bound.
    pub fn inject(&self, scope: &Scope) -> Scope {
        scope.inject(LAYOUT_KEY, json!({ "variables": self.variables }))
    }

    pub fn render(
        &self,
        env: &Environment<'static>,
        out: &mut dyn Write,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        self.body.render(env, out, &self.inject(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_variables_exposed() {
        let mut env = Environment::new();
        let content = "Variables:\n  brand: Tola\n  year: 2025\n==\n<footer>{{ layout.variables.brand }} {{ layout.variables.year }}</footer>";
        let layout = Layout::compile(&mut env, "layouts/default", content, false).unwrap();

        let mut out = Vec::new();
        layout.render(&env, &mut out, &Scope::default()).unwrap();

        assert_eq!(out, b"<footer>Tola 2025</footer>");
        assert_eq!(layout.variables().len(), 2);
    }

    #[test]
    fn test_layout_does_not_leak_into_caller_scope() {
        let mut env = Environment::new();
        let layout = Layout::compile(&mut env, "layouts/default", "==\nx", false).unwrap();
        let scope = Scope::default();

        let mut out = Vec::new();
        layout.render(&env, &mut out, &scope).unwrap();

        assert!(scope.get(LAYOUT_KEY).is_none());
    }

    #[test]
    fn test_layout_missing_delimiter() {
        let mut env = Environment::new();
        let err = Layout::compile(&mut env, "layouts/default", "<html></html>", false).unwrap_err();

        assert!(matches!(
            err,
            LoadError::MissingDelimiter { category: Category::Layout, name } if name == "default"
        ));
    }

    #[test]
    fn test_layout_bad_front_matter() {
        let mut env = Environment::new();
        let err = Layout::compile(&mut env, "layouts/default", "Variables: [1, 2\n==\nx", false).unwrap_err();

        assert!(matches!(err, LoadError::FrontMatter { .. }));
    }
}
