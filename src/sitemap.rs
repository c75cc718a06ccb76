//! Sitemap generation from the page registry.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <changefreq>weekly</changefreq>
//!     <priority>0.8</priority>
//!   </url>
//! </urlset>
//! ```

use crate::{
    loader::Registries,
    minify::{MinifyError, minify},
    template::PageMeta,
};

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

pub const SITEMAP_MIME: &str = "application/xml";

/// Sitemap data structure
#[derive(Debug, Default)]
pub struct Sitemap {
    urls: Vec<UrlEntry>,
}

/// Single URL entry in the sitemap
#[derive(Debug)]
struct UrlEntry {
    loc: String,
    /// YYYY-MM-DD
    lastmod: Option<String>,
    changefreq: Option<String>,
    priority: Option<f64>,
}

impl UrlEntry {
    fn from_meta(base_url: &str, meta: &PageMeta) -> Self {
        Self {
            loc: join_url(base_url, &meta.path),
            lastmod: meta
                .last_modified()
                .map(|ts| ts.format("%Y-%m-%d").to_string()),
            changefreq: (!meta.sitemap_change_frequency.is_empty())
                .then(|| meta.sitemap_change_frequency.clone()),
            priority: (meta.sitemap_priority > 0.0).then_some(meta.sitemap_priority),
        }
    }
}

impl Sitemap {
    /// One entry per non-draft page, in identifier order.
    pub fn from_registries(registries: &Registries, base_url: &str) -> Self {
        let urls = registries
            .pages()
            .map(|(_, page)| page.meta())
            .filter(|meta| !meta.draft)
            .map(|meta| UrlEntry::from_meta(base_url, meta))
            .collect();

        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Generate sitemap XML string.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in &self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = &entry.lastmod {
                xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
            }
            if let Some(changefreq) = &entry.changefreq {
                xml.push_str(&format!("    <changefreq>{}</changefreq>\n", escape_xml(changefreq)));
            }
            if let Some(priority) = entry.priority {
                xml.push_str(&format!("    <priority>{priority}</priority>\n"));
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// XML bytes, minified when `minify` is set.
    pub fn to_bytes(&self, minify_output: bool) -> Result<Vec<u8>, MinifyError> {
        let xml = self.to_xml();
        if minify_output {
            Ok(minify(SITEMAP_MIME, xml.as_bytes())?.into_owned())
        } else {
            Ok(xml.into_bytes())
        }
    }
}

/// `https://a.com/` + `/blog` -> `https://a.com/blog`
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
