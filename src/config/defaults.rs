//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [render] Section Defaults
// ============================================================================

pub mod render {
    use std::path::PathBuf;

    pub fn directory() -> PathBuf {
        "templates".into()
    }

    /// Seconds.
    pub fn cache_ttl() -> u64 {
        tola_render::cache::DEFAULT_TTL.as_secs()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        5277
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn base_url() -> Option<String> {
        None
    }
}
