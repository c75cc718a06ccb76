//! Configuration management for `tola-render.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                         |
//! |---------------|-------------------------------------------------|
//! | `[render]`    | Template directory, debug, minify, cache        |
//! | `[serve]`     | Development server (interface, port)            |
//! | `[build]`     | Static output directory and sitemap base URL    |
//! | `[variables]` | Default variables available to every template   |
//!
//! # Example
//!
//! ```toml
//! [render]
//! directory = "templates"
//! cache_ttl = 60
//!
//! [serve]
//! port = 5277
//!
//! [build]
//! output = "public"
//! base_url = "https://example.com"
//!
//! [variables]
//! site_name = "Example"
//! ```

mod build;
pub mod defaults;
mod error;
mod render;
mod serve;

use build::BuildSection;
use error::ConfigError;
use render::RenderSection;
use serve::ServeSection;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tola_render::{Filters, RenderOptions, Variables};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing tola-render.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub render: RenderSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub build: BuildSection,

    /// Default template variables
    #[serde(default)]
    pub variables: Variables,
}

impl RenderConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: RenderConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.render.directory, cli.directory.as_ref());
        Self::update_option(&mut self.render.debug, cli.debug.as_ref());
        Self::update_option(&mut self.render.minify, cli.minify.as_ref());
        Self::update_option(&mut self.render.cache, cli.cache.as_ref());

        match &cli.command {
            Commands::Build { output, base_url } => {
                Self::update_option(&mut self.build.output, output.as_ref());
                if base_url.is_some() {
                    self.build.base_url = base_url.clone();
                }
            }
            Commands::Serve { interface, port } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::Check | Commands::Render { .. } => {}
        }

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against the root and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, config: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(config));
        self.render.directory = Self::normalize_path(&root.join(&self.render.directory));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before any template is loaded
    pub fn validate(&self) -> Result<()> {
        let directory = &self.render.directory;
        if !directory.exists() {
            bail!(ConfigError::Validation(format!(
                "[render.directory] `{}` not found",
                directory.display()
            )));
        }
        if !directory.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[render.directory] `{}` is not a directory",
                directory.display()
            )));
        }

        if self.render.cache && self.render.cache_ttl == 0 {
            bail!(ConfigError::Validation(
                "[render.cache_ttl] must be greater than 0 when caching is enabled".into()
            ));
        }

        if self.serve.port == 0 {
            bail!(ConfigError::Validation("[serve.port] must not be 0".into()));
        }

        if let Some(base_url) = &self.build.base_url
            && !base_url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[build.base_url] must start with http:// or https://".into()
            ));
        }

        if self.build.output == self.render.directory {
            bail!(ConfigError::Validation(
                "[build.output] must differ from [render.directory]".into()
            ));
        }

        Ok(())
    }

    /// Renderer settings derived from this config.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            directory: self.render.directory.clone(),
            debug: self.render.debug,
            minify: self.render.minify,
            cache: self.render.cache,
            cache_ttl: Duration::from_secs(self.render.cache_ttl),
            variables: self.variables.clone(),
            filters: Filters::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tola-render").chain(args.iter().copied())).unwrap()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("templates/pages")).unwrap();
        dir
    }

    #[test]
    fn test_full_config() {
        let config = r#"
            [render]
            directory = "views"

            [serve]
            port = 9000

            [build]
            output = "site"

            [variables]
            site_name = "Example"
            nav = ["home", "about"]
        "#;
        let config = RenderConfig::from_str(config).unwrap();

        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.variables.get("site_name"), Some(&json!("Example")));
        assert_eq!(config.variables.get("nav"), Some(&json!(["home", "about"])));
    }

    #[test]
    fn test_unknown_section_rejection() {
        assert!(RenderConfig::from_str("[deploy]\nforce = true").is_err());
    }

    #[test]
    fn test_from_path_missing() {
        let dir = TempDir::new().unwrap();
        let err = RenderConfig::from_path(&dir.path().join("nope.toml")).unwrap_err();

        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Io(..))));
    }

    #[test]
    fn test_update_with_cli_overrides() {
        let dir = project();
        let root = dir.path().to_str().unwrap();
        let mut config = RenderConfig::default();
        config.update_with_cli(&cli(&[
            "--root", root, "--debug", "--cache=false", "build", "-o", "dist", "--base-url", "https://a.com",
        ]));

        assert!(config.render.debug);
        assert!(!config.render.cache);
        assert!(config.render.minify);
        assert!(config.render.directory.ends_with("templates"));
        assert!(config.render.directory.is_absolute());
        assert!(config.build.output.ends_with("dist"));
        assert_eq!(config.build.base_url.as_deref(), Some("https://a.com"));
        assert!(config.config_path.ends_with("tola-render.toml"));
    }

    #[test]
    fn test_update_with_cli_serve() {
        let mut config = RenderConfig::default();
        config.update_with_cli(&cli(&["serve", "-i", "0.0.0.0", "-p", "3000"]));

        assert_eq!(config.serve.interface, "0.0.0.0");
        assert_eq!(config.serve.port, 3000);
    }

    #[test]
    fn test_validate() {
        let dir = project();
        let root = dir.path().to_str().unwrap();
        let mut config = RenderConfig::default();
        config.update_with_cli(&cli(&["--root", root, "check"]));
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.render.directory = dir.path().join("missing");
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.render.cache_ttl = 0;
        assert!(bad.validate().is_err());
        bad.render.cache = false;
        assert!(bad.validate().is_ok());

        let mut bad = config.clone();
        bad.build.base_url = Some("example.com".into());
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.build.output = bad.render.directory.clone();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_render_options() {
        let mut config = RenderConfig::from_str("[render]\ncache_ttl = 5\n[variables]\na = 1").unwrap();
        config.render.debug = true;
        let options = config.render_options();

        assert!(options.debug);
        assert!(options.minify);
        assert_eq!(options.cache_ttl, Duration::from_secs(5));
        assert_eq!(options.variables.get("a"), Some(&json!(1)));
        assert!(options.filters.is_empty());
    }
}
