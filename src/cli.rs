//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tola render - template rendering for web pages
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file name, relative to the root (default: tola-render.toml)
    #[arg(short = 'C', long, global = true, default_value = "tola-render.toml")]
    pub config: PathBuf,

    /// Template directory (relative to project root)
    #[arg(short, long, global = true)]
    pub directory: Option<PathBuf>,

    /// Reload templates on every render and bypass the cache
    #[arg(long, global = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub debug: Option<bool>,

    /// Minify the html content
    #[arg(short, long, global = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Cache rendered output
    #[arg(long, global = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub cache: Option<bool>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load every template and report what was found
    Check,

    /// Render a single template to stdout or a file
    Render {
        /// Template identifier, e.g. `pages/home` or `blocks/hero`
        template: String,

        /// Template variable, repeatable
        #[arg(short, long = "var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Locale bound as `locale`
        #[arg(short, long)]
        locale: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every static page into the output directory
    Build {
        /// Output directory path (relative to project root)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override base URL used for sitemap.xml
        #[arg(long = "base-url")]
        base_url: Option<String>,
    },

    /// Serve pages rendered on demand
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// `key=value` -> `("key", "value")`
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

#[allow(unused)]
impl Cli {
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check)
    }
    pub const fn is_render(&self) -> bool {
        matches!(self.command, Commands::Render { .. })
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
