//! Tola render - render `.htm` templates from the command line.

mod build;
mod cli;
mod config;
mod logger;
mod serve;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::RenderConfig;
use serve::serve_site;
use std::{
    fs,
    io::{Write, stdout},
    path::Path,
};
use tola_render::{Category, Renderer, Variables};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let renderer = Renderer::new(config.render_options())
        .with_context(|| format!("Failed to load templates from {}", config.render.directory.display()))?;

    match &cli.command {
        Commands::Check => {
            check(&renderer);
            Ok(())
        }
        Commands::Render { template, vars, locale, output } => {
            render_one(&renderer, template, vars, locale.as_deref(), output.as_deref())
        }
        Commands::Build { .. } => build_site(&config, &renderer).map(|_| ()),
        Commands::Serve { .. } => serve_site(&config, renderer),
    }
}

/// Load and validate configuration from CLI arguments.
///
/// A missing config file is not an error; defaults apply.
fn load_config(cli: &Cli) -> Result<RenderConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        RenderConfig::from_path(&config_path)?
    } else {
        RenderConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}

fn check(renderer: &Renderer) {
    let registries = renderer.registries();
    for category in Category::ALL {
        log!("check"; "{}: {}", category, registries.count(category));
    }
    log!("check"; "{} templates loaded", registries.len());
}

fn render_one(
    renderer: &Renderer,
    template: &str,
    vars: &[(String, String)],
    locale: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let variables: Variables = vars
        .iter()
        .map(|(key, value)| (key.clone(), value.clone().into()))
        .collect();

    let mut html = Vec::new();
    renderer
        .render_localized(&mut html, template, variables, locale)
        .with_context(|| format!("Failed to render {template}"))?;

    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("Failed to write {}", path.display()))?;
            log!("render"; "{} -> {}", template, path.display());
        }
        None => {
            let mut stdout = stdout().lock();
            stdout.write_all(&html)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
