//! Blocks: standalone fragments rendered on their own.

use super::{Body, Category};
use crate::{
    error::{LoadError, RenderError},
    scope::Scope,
};
use minijinja::Environment;
use std::io::Write;

/// A standalone fragment. The whole file is the body.
#[derive(Debug, Clone)]
pub struct Block {
    body: Body,
}

impl Block {
    pub(crate) fn compile(
        env: &mut Environment<'static>,
        id: &str,
        content: String,
        minify: bool,
    ) -> Result<Self, LoadError> {
        let body = Body::compile(env, Category::Block, id, content, minify)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_renders_whole_file() {
        let mut env = Environment::new();
        let block = Block::compile(&mut env, "blocks/hero", "Title: x\n==\n<b>{{ 1 + 1 }}</b>".into(), false).unwrap();

        let mut out = Vec::new();
        block.render(&env, &mut out, &Scope::default()).unwrap();

        assert_eq!(out, b"Title: x\n==\n<b>2</b>");
    }
}
