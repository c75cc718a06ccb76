//! Pages: content rendered inside a layout.
//!
//! # Front matter
//!
//! ```yaml
//! Title: Hello
//! Description: First post
//! Keywords: [rust, web]
//! Language: en
//! Path: /hello
//! Layout: default
//! Author: Alice
//! RobotsIndex: true
//! RobotsFollow: true
//! Draft: false
//! Static: true
//! SitemapChangeFrequency: weekly
//! SitemapPriority: 0.8
//! CreatedAt: 2025-01-01
//! UpdatedAt: 2025-01-02 10:30:00
//! Variables:
//!   hero: true
//! ```
//!
//! Everything above is exposed to the template under `page.*` in snake case.

use super::{
    Body, Category, DEFAULT_LANGUAGE, DEFAULT_LAYOUT, DEFAULT_ROBOTS_FOLLOW, DEFAULT_ROBOTS_INDEX,
    PAGE_KEY, front_matter,
};
use crate::{
    error::{LoadError, RenderError},
    scope::{Scope, Variables},
};
use chrono::NaiveDateTime;
use educe::Educe;
use minijinja::Environment;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;

/// Output format of `created_at`/`updated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Page metadata parsed from front matter.
#[derive(Debug, Clone, Educe, Deserialize)]
#[educe(Default)]
#[serde(default, rename_all = "PascalCase")]
pub struct PageMeta {
    pub title: String,

    pub description: String,

    pub keywords: Vec<String>,

    #[educe(Default = DEFAULT_LANGUAGE.to_owned())]
    pub language: String,

    /// URL path. Defaults to `/` + the page name.
    pub path: String,

    /// Layout name, without the `layouts/` prefix.
    #[educe(Default = DEFAULT_LAYOUT.to_owned())]
    pub layout: String,

    pub author: String,

    #[educe(Default = DEFAULT_ROBOTS_INDEX)]
    pub robots_index: bool,

    #[educe(Default = DEFAULT_ROBOTS_FOLLOW)]
    pub robots_follow: bool,

    pub draft: bool,

    /// Pre-rendered by `build`.
    #[serde(rename = "Static")]
    pub is_static: bool,

    pub sitemap_change_frequency: String,

    pub sitemap_priority: f64,

    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<NaiveDateTime>,

    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<NaiveDateTime>,

    pub variables: Variables,
}

impl PageMeta {
    /// The `page` namespace handed to templates.
    pub fn to_value(&self) -> serde_json::Value {
        json!({
            "title": self.title,
            "description": self.description,
            "keywords": self.keywords.join(","),
            "language": self.language,
            "path": self.path,
            "layout": self.layout,
            "author": self.author,
            "robots_index": self.robots_index,
            "robots_follow": self.robots_follow,
            "draft": self.draft,
            "static": self.is_static,
            "sitemap_change_frequency": self.sitemap_change_frequency,
            "sitemap_priority": self.sitemap_priority,
            "created_at": format_timestamp(self.created_at),
            "updated_at": format_timestamp(self.updated_at),
            "variables": self.variables,
        })
    }

    /// Most recent of `updated_at` and `created_at`.
    pub fn last_modified(&self) -> Option<NaiveDateTime> {
        self.updated_at.or(self.created_at)
    }
}

fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// A page. Never minifies its own output; the enclosing layout does.
#[derive(Debug, Clone)]
pub struct Page {
    meta: PageMeta,
    body: Body,
}

impl Page {
    pub(crate) fn compile(
        env: &mut Environment<'static>,
        id: &str,
        content: &str,
        minify: bool,
    ) -> Result<Self, LoadError> {
        let name = Category::Page.bare(id);
        let (front, body) = front_matter::split(Category::Page, name, content)?;
        let mut meta: PageMeta = front_matter::parse(Category::Page, name, front)?;
        if meta.path.is_empty() {
            meta.path = format!("/{name}");
        }
        let body = Body::compile(env, Category::Page, id, body.to_owned(), minify)?;

        Ok(Self { meta, body })
    }

    pub const fn meta(&self) -> &PageMeta {
        &self.meta
    }

    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// `scope` with the `page` namespace bound.
    pub fn inject(&self, scope: &Scope) -> Scope {
        scope.inject(PAGE_KEY, self.meta.to_value())
    }

    pub fn render(
        &self,
        env: &Environment<'static>,
        out: &mut dyn Write,
        scope: &Scope,
    ) -> Result<(), RenderError> {
        self.body.stream(env, out, &self.inject(scope))
    }

    /// Render into a string, ready to be embedded in a layout.
    pub fn render_to_string(&self, env: &Environment<'static>, scope: &Scope) -> Result<String, RenderError> {
        let template = env.get_template(self.body.id())?;
        Ok(template.render(self.inject(scope).to_value())?)
    }
}

mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, de::Error};

    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        if let Some(dt) = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        {
            return Some(dt);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{s}`"))),
        }
    }
}
