//! Minification registry keyed by MIME type.
//!
//! The process-wide [`MINIFIER`] is built once on first use. Content of a
//! type with no registered strategy passes through unchanged.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use minify_js::{Session, TopLevelMode};
use rustc_hash::FxHashMap;
use std::{borrow::Cow, sync::LazyLock};
use thiserror::Error;

/// MIME type used for every rendered template.
pub const HTML_MIME: &str = "text/html";
pub const CSS_MIME: &str = "text/css";
pub const JS_MIME: &str = "application/javascript";

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("content of type `{0}` is not valid UTF-8")]
    Utf8(String),

    #[error("failed to minify json")]
    Json(#[from] serde_json::Error),

    #[error("failed to minify css: {0}")]
    Css(String),

    #[error("failed to minify javascript: {0}")]
    Js(String),
}

// ============================================================================
// Strategies
// ============================================================================

/// A minification algorithm for one content type.
pub trait MinifyStrategy: Send + Sync {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError>;
}

/// HTML via the `minify_html` crate.
pub struct HtmlMinifier {
    cfg: minify_html::Cfg,
}

impl Default for HtmlMinifier {
    fn default() -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = false;
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.remove_bangs = true;
        cfg.remove_processing_instructions = true;
        Self { cfg }
    }
}

impl MinifyStrategy for HtmlMinifier {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
        Ok(minify_html::minify(content, &self.cfg))
    }
}

/// Stylesheets via `lightningcss`.
pub struct CssMinifier;

impl MinifyStrategy for CssMinifier {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let code = std::str::from_utf8(content).map_err(|_| MinifyError::Utf8(CSS_MIME.into()))?;
        let mut sheet = StyleSheet::parse(code, ParserOptions::default())
            .map_err(|err| MinifyError::Css(err.to_string()))?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|err| MinifyError::Css(err.to_string()))?;
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|err| MinifyError::Css(err.to_string()))?;

        Ok(smaller(printed.code.into_bytes(), content))
    }
}

/// Scripts via `minify-js`, parsed as classic (non-module) scripts.
pub struct JsMinifier;

impl MinifyStrategy for JsMinifier {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let session = Session::new();
        let mut out = Vec::new();
        minify_js::minify(&session, TopLevelMode::Global, content, &mut out)
            .map_err(|err| MinifyError::Js(err.to_string()))?;

        Ok(smaller(out, content))
    }
}

/// Minified output, unless it came out no smaller than the input.
fn smaller(minified: Vec<u8>, original: &[u8]) -> Vec<u8> {
    if minified.len() < original.len() {
        minified
    } else {
        original.to_vec()
    }
}

/// XML (and SVG) by trimming every line and dropping blank ones.
pub struct XmlMinifier {
    mime: &'static str,
}

impl MinifyStrategy for XmlMinifier {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let text = std::str::from_utf8(content).map_err(|_| MinifyError::Utf8(self.mime.into()))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<String>()
            .into_bytes())
    }
}

/// JSON by re-serializing without whitespace.
pub struct JsonMinifier;

impl MinifyStrategy for JsonMinifier {
    fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
        let value: serde_json::Value = serde_json::from_slice(content)?;
        Ok(serde_json::to_vec(&value)?)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Process-wide minifier with the default strategies registered.
pub static MINIFIER: LazyLock<Minifier> = LazyLock::new(Minifier::with_defaults);

/// Maps MIME types to minification strategies.
#[derive(Default)]
pub struct Minifier {
    strategies: FxHashMap<String, Box<dyn MinifyStrategy>>,
}

impl Minifier {
    /// An empty registry: everything passes through.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut minifier = Self::new();
        minifier.add(HTML_MIME, HtmlMinifier::default());
        minifier.add(CSS_MIME, CssMinifier);
        minifier.add(JS_MIME, JsMinifier);
        minifier.add("text/javascript", JsMinifier);
        minifier.add("application/json", JsonMinifier);
        minifier.add("application/xml", XmlMinifier { mime: "application/xml" });
        minifier.add("image/svg+xml", XmlMinifier { mime: "image/svg+xml" });
        minifier
    }

    pub fn add(&mut self, mime: &str, strategy: impl MinifyStrategy + 'static) {
        self.strategies
            .insert(mime.to_ascii_lowercase(), Box::new(strategy));
    }

    pub fn supports(&self, mime: &str) -> bool {
        self.strategies.contains_key(&essence(mime))
    }

    /// Minify `content` as `mime`.
    ///
    /// Parameters such as `; charset=utf-8` are ignored for lookup.
    /// Returns `Cow::Borrowed` when no strategy is registered.
    pub fn minify<'a>(&self, mime: &str, content: &'a [u8]) -> Result<Cow<'a, [u8]>, MinifyError> {
        match self.strategies.get(&essence(mime)) {
            Some(strategy) => strategy.minify(content).map(Cow::Owned),
            None => Ok(Cow::Borrowed(content)),
        }
    }
}

/// Minify with the process-wide registry.
pub fn minify<'a>(mime: &str, content: &'a [u8]) -> Result<Cow<'a, [u8]>, MinifyError> {
    MINIFIER.minify(mime, content)
}

/// `text/html; charset=utf-8` -> `text/html`
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_html_basic() {
        let html = b"<html>\n  <head>\n  </head>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>";
        let result = minify(HTML_MIME, html).unwrap();
        let result_str = String::from_utf8_lossy(&result);

        assert!(!result_str.contains("\n  "));
        assert!(result_str.contains("<p>Hello</p>"));
        assert!(result.len() < html.len());
    }

    #[test]
    fn test_minify_html_is_idempotent_on_size() {
        let html = b"<div>\n  <p>  Hello   World  </p>\n  <!-- note -->\n</div>";
        let once = minify(HTML_MIME, html).unwrap().into_owned();
        let twice = minify(HTML_MIME, &once).unwrap();

        assert!(twice.len() <= once.len());
    }

    #[test]
    fn test_minify_with_charset_parameter() {
        let html = b"<p>\n  Hi\n</p>";
        let plain = minify(HTML_MIME, html).unwrap().into_owned();
        let with_charset = minify("text/html; charset=utf-8", html).unwrap();

        assert_eq!(plain, &*with_charset);
    }

    #[test]
    fn test_unregistered_type_passes_through() {
        let content = b"Hello,   world.\n\n  Bye.";
        let result = minify("text/plain", content).unwrap();

        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, content);
    }

    #[test]
    fn test_minify_css() {
        let css = b"body {\n  color: #ff0000;\n  margin: 0px;\n}\n\n/* note */\n";
        let result = minify(CSS_MIME, css).unwrap();
        let result_str = String::from_utf8_lossy(&result);

        assert!(!result_str.contains('\n'));
        assert!(!result_str.contains("note"));
        assert!(result_str.starts_with("body{"));
        assert!(result.len() < css.len());
    }

    #[test]
    fn test_minify_css_is_idempotent_on_size() {
        let css = b"a { color: red; }  .b  { padding: 1px 1px 1px 1px; }";
        let once = minify("text/css; charset=utf-8", css).unwrap().into_owned();
        let twice = minify(CSS_MIME, &once).unwrap();

        assert!(twice.len() <= once.len());
    }

    #[test]
    fn test_minify_css_invalid_utf8() {
        assert!(matches!(minify(CSS_MIME, &[0xff]), Err(MinifyError::Utf8(_))));
    }

    #[test]
    fn test_minify_js() {
        let js = b"const main = () => {\n  let my_first_variable = 1;\n};\n";
        let result = minify(JS_MIME, js).unwrap();

        assert_eq!(&*result, b"const main=()=>{let a=1}");
        assert_eq!(&*minify("text/javascript", js).unwrap(), &*result);
    }

    #[test]
    fn test_minify_js_syntax_error() {
        assert!(matches!(minify(JS_MIME, b"function ( {"), Err(MinifyError::Js(_))));
    }

    #[test]
    fn test_smaller_keeps_original_when_not_shorter() {
        assert_eq!(smaller(b"abcd".to_vec(), b"abc"), b"abc");
        assert_eq!(smaller(b"ab".to_vec(), b"abc"), b"ab");
    }

    #[test]
    fn test_empty_registry_passes_through_html() {
        let minifier = Minifier::new();
        let html = b"<p>\n  Hi\n</p>";

        assert_eq!(&*minifier.minify(HTML_MIME, html).unwrap(), html);
        assert!(!minifier.supports(HTML_MIME));
    }

    #[test]
    fn test_minify_xml_basic() {
        let xml = br#"<?xml version="1.0"?>
<root>
  <item>Hello</item>
</root>"#;
        let result = minify("application/xml", xml).unwrap();

        assert_eq!(
            &*result,
            br#"<?xml version="1.0"?><root><item>Hello</item></root>"#
        );
    }

    #[test]
    fn test_minify_xml_removes_empty_lines() {
        let xml = b"<root>\n\n  <item/>\n\n</root>";
        let result = minify("application/xml", xml).unwrap();

        assert_eq!(&*result, b"<root><item/></root>");
    }

    #[test]
    fn test_minify_svg_invalid_utf8() {
        let result = minify("image/svg+xml", &[0xff, 0xfe]);

        assert!(matches!(result, Err(MinifyError::Utf8(mime)) if mime == "image/svg+xml"));
    }

    #[test]
    fn test_minify_json() {
        let json = b"{\n  \"a\": [1, 2],\n  \"b\": \"x y\"\n}";
        let result = minify("application/json", json).unwrap();

        assert_eq!(&*result, br#"{"a":[1,2],"b":"x y"}"#);
    }

    #[test]
    fn test_minify_json_invalid() {
        assert!(matches!(
            minify("application/json", b"{not json"),
            Err(MinifyError::Json(_))
        ));
    }

    #[test]
    fn test_custom_strategy() {
        struct Upper;
        impl MinifyStrategy for Upper {
            fn minify(&self, content: &[u8]) -> Result<Vec<u8>, MinifyError> {
                Ok(content.to_ascii_uppercase())
            }
        }

        let mut minifier = Minifier::new();
        minifier.add("Text/Plain", Upper);

        assert!(minifier.supports("text/plain"));
        assert_eq!(&*minifier.minify("text/plain", b"abc").unwrap(), b"ABC");
    }
}
