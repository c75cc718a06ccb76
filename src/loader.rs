//! Entity loader: walks the template directory and builds the registries.
//!
//! ```text
//! load(dir)
//!   │
//!   ├── fresh Environment (auto-escape off) + custom filters
//!   │
//!   └── walk dir (*.htm, sorted)
//!         │
//!         ├── identifier = relative path, `/`-separated, extension stripped
//!         ├── classify by prefix ── no match ──► skip
//!         └── compile entity ───── error ──────► abort whole load
//! ```

use crate::{
    error::LoadError,
    filters::Filters,
    template::{Block, Category, EXTENSION, LAYOUTS_PREFIX, Layout, Page, Partial},
};
use minijinja::{AutoEscape, Environment};
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path},
};
use walkdir::WalkDir;

/// The four entity registries plus the environment their bodies live in.
pub struct Registries {
    env: Environment<'static>,
    pub blocks: BTreeMap<String, Block>,
    pub partials: BTreeMap<String, Partial>,
    pub layouts: BTreeMap<String, Layout>,
    pub pages: BTreeMap<String, Page>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new(new_environment())
    }
}

impl Registries {
    fn new(env: Environment<'static>) -> Self {
        Self {
            env,
            blocks: BTreeMap::new(),
            partials: BTreeMap::new(),
            layouts: BTreeMap::new(),
            pages: BTreeMap::new(),
        }
    }

    pub const fn env(&self) -> &Environment<'static> {
        &self.env
    }

    /// Total number of loaded entities.
    pub fn len(&self) -> usize {
        self.blocks.len() + self.partials.len() + self.layouts.len() + self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entities in `category`.
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Block => self.blocks.len(),
            Category::Partial => self.partials.len(),
            Category::Layout => self.layouts.len(),
            Category::Page => self.pages.len(),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        match Category::classify(identifier) {
            Some(Category::Block) => self.blocks.contains_key(identifier),
            Some(Category::Partial) => self.partials.contains_key(identifier),
            Some(Category::Layout) => self.layouts.contains_key(identifier),
            Some(Category::Page) => self.pages.contains_key(identifier),
            None => false,
        }
    }

    /// Every page with its identifier, drafts included, in identifier order.
    pub fn pages(&self) -> impl Iterator<Item = (&str, &Page)> {
        self.pages.iter().map(|(id, page)| (id.as_str(), page))
    }

    /// Layout a page refers to by bare name.
    pub fn layout_for(&self, page: &Page) -> Option<&Layout> {
        self.layouts
            .get(&format!("{LAYOUTS_PREFIX}{}", page.meta().layout))
    }

    /// Page whose URL path is `path`, drafts excluded.
    pub fn page_by_path(&self, path: &str) -> Option<(&str, &Page)> {
        self.pages()
            .find(|(_, page)| !page.meta().draft && page.meta().path == path)
    }

    fn insert(&mut self, category: Category, id: String, content: String, minify: bool) -> Result<(), LoadError> {
        let env = &mut self.env;
        match category {
            Category::Block => {
                let block = Block::compile(env, &id, content, minify)?;
                self.blocks.insert(id, block);
            }
            Category::Partial => {
                let partial = Partial::compile(env, &id, content, minify)?;
                self.partials.insert(id, partial);
            }
            Category::Layout => {
                let layout = Layout::compile(env, &id, &content, minify)?;
                self.layouts.insert(id, layout);
            }
            Category::Page => {
                let page = Page::compile(env, &id, &content, minify)?;
                self.pages.insert(id, page);
            }
        }
        Ok(())
    }
}

/// Load every template under `directory`.
///
/// The first failure aborts the load; nothing partial is returned.
pub fn load(directory: &Path, filters: &Filters, minify: bool) -> Result<Registries, LoadError> {
    let mut env = new_environment();
    filters.install(&mut env)?;
    let mut registries = Registries::new(env);

    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|err| LoadError::Walk(directory.to_path_buf(), err))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(id) = identifier(directory, path) else {
            continue;
        };
        let Some(category) = Category::classify(&id) else {
            continue;
        };

        let content = fs::read_to_string(path).map_err(|err| LoadError::Io(path.to_path_buf(), err))?;
        registries.insert(category, id, content, minify)?;
    }

    Ok(registries)
}

fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

/// `root/pages/blog/post.htm` -> `pages/blog/post`
///
/// Returns `None` for files without the template extension.
fn identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let joined = parts.join("/");
    let stem = joined.strip_suffix(EXTENSION)?;
    let file_stem = stem.rsplit('/').next().unwrap_or(stem);
    (!file_stem.is_empty()).then(|| stem.to_owned())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterError;
    use minijinja::{Value, value::Rest};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(&dir, "blocks/hero.htm", "<section>{{ title }}</section>");
        write(&dir, "partials/nav.htm", "<nav></nav>");
        write(&dir, "layouts/default.htm", "==\n<html>{{ embed }}</html>");
        write(&dir, "pages/home.htm", "Layout: default\n==\nHello");
        write(&dir, "pages/blog/post.htm", "Title: Post\n==\nPost");
        write(&dir, "README.md", "not a template");
        write(&dir, "emails/welcome.htm", "{% broken");
        write(&dir, "pages/notes.txt", "ignored");
        dir
    }

    #[test]
    fn test_identifier() {
        let root = PathBuf::from("/site");

        assert_eq!(
            identifier(&root, Path::new("/site/pages/blog/post.htm")),
            Some("pages/blog/post".into())
        );
        assert_eq!(identifier(&root, Path::new("/site/pages/a.html")), None);
        assert_eq!(identifier(&root, Path::new("/site/pages/.htm")), None);
        assert_eq!(identifier(&root, Path::new("/elsewhere/a.htm")), None);
    }

    #[test]
    fn test_load_classifies_and_skips() {
        let dir = site();
        let registries = load(dir.path(), &Filters::new(), false).unwrap();

        assert_eq!(registries.count(Category::Block), 1);
        assert_eq!(registries.count(Category::Partial), 1);
        assert_eq!(registries.count(Category::Layout), 1);
        assert_eq!(registries.count(Category::Page), 2);
        assert_eq!(registries.len(), 5);
        assert!(registries.contains("pages/blog/post"));
        assert!(!registries.contains("emails/welcome"));
    }

    #[test]
    fn test_load_page_defaults() {
        let dir = site();
        let registries = load(dir.path(), &Filters::new(), false).unwrap();
        let page = &registries.pages["pages/blog/post"];

        assert_eq!(page.meta().path, "/blog/post");
        assert!(registries.layout_for(page).is_some());
        assert_eq!(registries.page_by_path("/home").map(|(id, _)| id), Some("pages/home"));
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = TempDir::new().unwrap();
        let registries = load(dir.path(), &Filters::new(), true).unwrap();

        assert!(registries.is_empty());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("nope"), &Filters::new(), false);

        assert!(matches!(result, Err(LoadError::Walk(..))));
    }

    #[test]
    fn test_load_aborts_on_syntax_error() {
        let dir = site();
        write(&dir, "partials/broken.htm", "{% for x in %}");
        let result = load(dir.path(), &Filters::new(), false);

        assert!(matches!(
            result,
            Err(LoadError::Content { category: Category::Partial, name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn test_load_aborts_on_missing_delimiter() {
        let dir = site();
        write(&dir, "pages/bad.htm", "no delimiter here");
        let result = load(dir.path(), &Filters::new(), false);

        assert!(matches!(
            result,
            Err(LoadError::MissingDelimiter { category: Category::Page, name }) if name == "bad"
        ));
    }

    #[test]
    fn test_load_aborts_on_invalid_filter() {
        let dir = site();
        let filters = Filters::new().with("no good", |v: Value, _: Rest<Value>| Ok(v));
        let result = load(dir.path(), &filters, false);

        assert!(matches!(result, Err(LoadError::Filter(_))));
    }

    #[test]
    fn test_load_aborts_on_builtin_filter_collision() {
        let dir = TempDir::new().unwrap();
        write(&dir, "blocks/x.htm", "{{ 'abc'|upper }}");
        let filters = Filters::new().with("upper", |_: Value, _: Rest<Value>| Ok(Value::from("HIJACKED")));
        let result = load(dir.path(), &filters, false);

        assert!(matches!(
            result,
            Err(LoadError::Filter(FilterError::Duplicate(name))) if name == "upper"
        ));
    }

    #[test]
    fn test_load_installs_filters() {
        let dir = TempDir::new().unwrap();
        write(&dir, "blocks/x.htm", "{{ 'a'|twice }}");
        let filters = Filters::new().with("twice", |v: Value, _: Rest<Value>| {
            Ok(Value::from(format!("{v}{v}")))
        });
        let registries = load(dir.path(), &filters, false).unwrap();

        let out = registries.env().get_template("blocks/x").unwrap().render(()).unwrap();
        assert_eq!(out, "aa");
    }
}
