//! `[render]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[render]` section in tola-render.toml - renderer behavior.
///
/// # Example
/// ```toml
/// [render]
/// directory = "templates"
/// debug = false      # reload templates on every render
/// minify = true
/// cache = true
/// cache_ttl = 60     # seconds
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    /// Template root, relative to the project root.
    #[serde(default = "defaults::render::directory")]
    #[educe(Default = defaults::render::directory())]
    pub directory: PathBuf,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub minify: bool,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub cache: bool,

    /// Lifetime of a cached render in seconds.
    #[serde(default = "defaults::render::cache_ttl")]
    #[educe(Default = defaults::render::cache_ttl())]
    pub cache_ttl: u64,
}
