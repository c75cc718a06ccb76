//! `[serve]` section configuration.
//!
//! Contains development server settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[serve]` section in tola-render.toml - development server settings.
///
/// # Example
/// ```toml
/// [serve]
/// interface = "0.0.0.0"  # Listen on all interfaces
/// port = 3000
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// HTTP port number (default: 5277).
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::super::RenderConfig;

    #[test]
    fn test_serve_section() {
        let config = r#"
            [serve]
            interface = "0.0.0.0"
            port = 8080
        "#;
        let config = RenderConfig::from_str(config).unwrap();

        assert_eq!(config.serve.interface, "0.0.0.0");
        assert_eq!(config.serve.port, 8080);
    }

    #[test]
    fn test_serve_section_defaults() {
        let config = RenderConfig::from_str("[render]").unwrap();

        assert_eq!(config.serve.interface, "127.0.0.1");
        assert_eq!(config.serve.port, 5277);
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [serve]
            watch = true
        "#;
        assert!(RenderConfig::from_str(config).is_err());
    }
}
