//! Partials: reusable fragments, usually pulled in with `{% include %}`.

use super::{Body, Category};
use crate::{
    error::{LoadError, RenderError},
    scope::Scope,
};
use minijinja::Environment;
use std::io::Write;

/// A reusable fragment. Same shape as a block.
#[derive(Debug, Clone)]
pub struct Partial {
    body: Body,
}

impl Partial {
    pub(crate) fn compile(
        env: &mut Environment<'static>,
        id: &str,
        content: String,
        minify: bool,
    ) -> Result<Self, LoadError> {
        let body = Body::compile(env, Category::Partial, id, content, minify)?;
        Ok(Self { body })
    }

    pub const fn body(&self) -> &Body {
        &self.body
    }

    pub fn render(
        &self,
        env: &Environment<'static>,
        out: &mut dyn Write,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        self.body.render(env, out, scope)
    }
}
