//! Tola render - template rendering layer for web pages.
//!
//! Loads a directory of `.htm` templates organized into four categories and
//! renders them into HTML with optional minification and response caching.
//!
//! ```text
//! templates/
//! ├── blocks/      standalone fragments
//! ├── partials/    reusable fragments
//! ├── layouts/     page shells (front matter + body)
//! └── pages/       pages (front matter + body), rendered inside a layout
//! ```
//!
//! # Example
//!
//! ```ignore
//! use tola_render::{RenderOptions, Renderer, Variables};
//!
//! let renderer = Renderer::new(RenderOptions::new("templates"))?;
//! let mut out = Vec::new();
//! renderer.render(&mut out, "pages/home", Variables::new())?;
//! ```

pub mod cache;
pub mod error;
pub mod filters;
pub mod loader;
pub mod minify;
pub mod renderer;
pub mod scope;
pub mod sitemap;
pub mod template;

pub use cache::{CacheStore, MemoryStore};
pub use error::{LoadError, RenderError};
pub use filters::Filters;
pub use loader::{Registries, load};
pub use renderer::{RenderOptions, Renderer};
pub use scope::{Scope, Variables};
pub use template::Category;
