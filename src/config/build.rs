//! `[build]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in tola-render.toml - static output settings.
///
/// # Example
/// ```toml
/// [build]
/// output = "public"
/// base_url = "https://example.com"   # required for sitemap.xml
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Project root. Set from `--root`, never read from the file.
    #[serde(skip)]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Site URL; sitemap generation is skipped without it.
    #[serde(default = "defaults::build::base_url")]
    #[educe(Default = defaults::build::base_url())]
    pub base_url: Option<String>,
}
