//! Top-level renderer: lookup, composition, minification and caching.
//!
//! # Render pipeline
//!
//! ```text
//! render(out, "pages/home", vars)
//!   │
//!   ├── lock ─────────────────────── one render at a time
//!   ├── scope = defaults + vars
//!   ├── key = fingerprint(template, scope)
//!   ├── debug? ── reload templates, skip cache
//!   ├── cache hit? ── write cached bytes ──► done
//!   ├── dispatch by prefix
//!   │     blocks/ partials/ layouts/ ── render entity
//!   │     pages/ ── render page ─► embed ─► render its layout
//!   │     other ── nothing (empty output)
//!   ├── cache store (ttl)
//!   └── write bytes to out
//! ```
//!
//! Registries are swapped atomically on reload, so readers of
//! [`Renderer::registries`] never observe a half-built set.

use crate::{
    cache::{self, CacheStore, DEFAULT_TTL, MemoryStore},
    error::{LoadError, RenderError},
    filters::Filters,
    loader::{self, Registries},
    scope::{Scope, Variables},
    template::{Category, EMBED_KEY, LOCALE_KEY},
};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::{
    io::Write,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Options
// ============================================================================

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Template root directory.
    pub directory: PathBuf,
    /// Reload templates before every render and bypass the cache.
    pub debug: bool,
    /// Minify block, partial and layout output as `text/html`.
    pub minify: bool,
    /// Cache rendered output.
    pub cache: bool,
    /// Lifetime of a cached render.
    pub cache_ttl: Duration,
    /// Process-wide default variables; caller variables override them.
    pub variables: Variables,
    /// Custom template filters.
    pub filters: Filters,
}

impl RenderOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            debug: false,
            minify: true,
            cache: true,
            cache_ttl: DEFAULT_TTL,
            variables: Variables::new(),
            filters: Filters::new(),
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Shared renderer. Safe to use from many request handlers at once.
pub struct Renderer {
    options: RenderOptions,
    defaults: Arc<Variables>,
    registries: ArcSwap<Registries>,
    loaded: AtomicBool,
    store: Box<dyn CacheStore>,
    lock: Mutex<()>,
}

impl Renderer {
    /// Create a renderer with an in-memory cache and load the templates.
    pub fn new(options: RenderOptions) -> Result<Self, LoadError> {
        Self::with_store(options, MemoryStore::default())
    }

    /// Create a renderer backed by `store` and load the templates.
    pub fn with_store(options: RenderOptions, store: impl CacheStore + 'static) -> Result<Self, LoadError> {
        let renderer = Self {
            defaults: Arc::new(options.variables.clone()),
            options,
            registries: ArcSwap::from_pointee(Registries::default()),
            loaded: AtomicBool::new(false),
            store: Box::new(store),
            lock: Mutex::new(()),
        };
        renderer.reload_unlocked()?;
        Ok(renderer)
    }

    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Snapshot of the current registries.
    pub fn registries(&self) -> Arc<Registries> {
        self.registries.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Reload every template from disk.
    pub fn reload(&self) -> Result<(), LoadError> {
        let _guard = self.lock.lock();
        self.reload_unlocked()
    }

    /// Load the templates unless a load already succeeded.
    pub fn ensure_loaded(&self) -> Result<(), LoadError> {
        let _guard = self.lock.lock();
        if !self.is_loaded() {
            self.reload_unlocked()?;
        }
        Ok(())
    }

    /// Drop every cached render.
    pub fn clear_cache(&self) -> Result<(), RenderError> {
        let _guard = self.lock.lock();
        Ok(self.store.clear()?)
    }

    /// Render `template` with `variables` into `out`.
    pub fn render<W: Write + ?Sized>(&self, out: &mut W, template: &str, variables: Variables) -> Result<(), RenderError> {
        self.render_localized(out, template, variables, None)
    }

    /// Like [`Renderer::render`], additionally binding `locale`.
    ///
    /// Nothing is written to `out` unless the render succeeds.
    pub fn render_localized<W: Write + ?Sized>(
        &self,
        out: &mut W,
        template: &str,
        variables: Variables,
        locale: Option<&str>,
    ) -> Result<(), RenderError> {
        let _guard = self.lock.lock();

        let mut scope = Scope::new(Arc::clone(&self.defaults), variables);
        if let Some(locale) = locale {
            scope = scope.inject(LOCALE_KEY, locale);
        }
        let key = cache::fingerprint(template, &scope);

        if self.options.debug || !self.is_loaded() {
            self.reload_unlocked()?;
        }

        let use_cache = self.options.cache && !self.options.debug;
        if use_cache
            && let Some(cached) = self.store.get(&key)?
            && !cached.is_empty()
        {
            out.write_all(&cached)?;
            return Ok(());
        }

        let rendered = self.compose(template, &scope)?;

        if use_cache {
            self.store.set(&key, &rendered, self.options.cache_ttl)?;
        }
        out.write_all(&rendered)?;
        Ok(())
    }

    /// Render `template` into a fresh buffer.
    ///
    /// Identifiers outside the four categories produce an empty buffer.
    fn compose(&self, template: &str, scope: &Scope) -> Result<Vec<u8>, RenderError> {
        let registries = self.registries.load();
        let env = registries.env();
        let mut buffer = Vec::new();

        let Some(category) = Category::classify(template) else {
            return Ok(buffer);
        };
        let not_found = || RenderError::NotFound {
            category,
            name: category.bare(template).to_owned(),
        };

        match category {
            Category::Block => {
                let block = registries.blocks.get(template).ok_or_else(not_found)?;
                block.render(env, &mut buffer, scope)?;
            }
            Category::Partial => {
                let partial = registries.partials.get(template).ok_or_else(not_found)?;
                partial.render(env, &mut buffer, scope)?;
            }
            Category::Layout => {
                let layout = registries.layouts.get(template).ok_or_else(not_found)?;
                layout.render(env, &mut buffer, scope)?;
            }
            Category::Page => {
                let page = registries.pages.get(template).ok_or_else(not_found)?;
                let layout = registries
                    .layout_for(page)
                    .ok_or_else(|| RenderError::LayoutNotFound {
                        page: category.bare(template).to_owned(),
                        layout: page.meta().layout.clone(),
                    })?;

                let embed = page.render_to_string(env, scope)?;
                let scope = page.inject(scope).inject(EMBED_KEY, embed);
                layout.render(env, &mut buffer, &scope)?;
            }
        }

        Ok(buffer)
    }

    /// Build fresh registries and swap them in. Caller holds the lock.
    fn reload_unlocked(&self) -> Result<(), LoadError> {
        let registries = loader::load(
            &self.options.directory,
            &self.options.filters,
            self.options.minify,
        )?;
        self.registries.store(Arc::new(registries));
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
