//! Static output generation.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── collect static pages (non-draft, `Static: true`)
//!     │
//!     ├── render each page ──► output/<path>/index.html
//!     │
//!     └── base_url set? ──► output/sitemap.xml
//! ```

use crate::{config::RenderConfig, log, logger::Progress};
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use tola_render::{Renderer, Variables, sitemap::Sitemap};

/// Render every static page into the output directory.
///
/// Returns the number of pages written.
pub fn build_site(config: &RenderConfig, renderer: &Renderer) -> Result<usize> {
    let output = &config.build.output;
    let registries = renderer.registries();

    let pages: Vec<_> = registries
        .pages()
        .filter(|(_, page)| page.meta().is_static && !page.meta().draft)
        .collect();

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    log!("build"; "rendering {} pages...", pages.len());
    let progress = Progress::new("build", pages.len());

    for (id, page) in &pages {
        let target = output_path(output, &page.meta().path)?;
        let mut html = Vec::new();
        renderer
            .render(&mut html, id, Variables::new())
            .with_context(|| format!("Failed to render {id}"))?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, html).with_context(|| format!("Failed to write {}", target.display()))?;

        if let Some(progress) = &progress {
            progress.step(id);
        }
    }

    if let Some(progress) = &progress {
        progress.finish();
    }

    match &config.build.base_url {
        Some(base_url) => {
            let sitemap = Sitemap::from_registries(&registries, base_url);
            let target = output.join("sitemap.xml");
            fs::write(&target, sitemap.to_bytes(config.render.minify)?)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            log!("build"; "sitemap.xml with {} urls", sitemap.len());
        }
        None => log!("build"; "no [build.base_url], skipping sitemap.xml"),
    }

    log!("build"; "done, {} pages in {}", pages.len(), output.display());
    Ok(pages.len())
}

/// `public` + `/blog/post` -> `public/blog/post/index.html`
fn output_path(output: &Path, url_path: &str) -> Result<PathBuf> {
    let relative = Path::new(url_path.trim_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("page path `{url_path}` escapes the output directory");
    }
    Ok(output.join(relative).join("index.html"))
}
