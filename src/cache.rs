//! Rendered-output cache.
//!
//! [`CacheStore`] is the seam for any key -> bytes store with per-entry
//! expiry; [`MemoryStore`] is the in-process default.

use crate::scope::Scope;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default lifetime of a cached render.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between sweeps of expired entries.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
#[error("cache store error: {0}")]
pub struct CacheError(pub String);

/// Key -> bytes store with per-entry expiry.
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry. Expired entries are reported as missing.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}

/// Cache key for a template rendered against `scope`.
///
/// Content-addressed: the same identifier with different variables never
/// shares a key.
pub fn fingerprint(template: &str, scope: &Scope) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(template.as_bytes());
    hasher.update(scope.fingerprint_source().as_bytes());
    format!("html-{}", hex::encode(hasher.finalize().as_bytes()))
}

// ============================================================================
// MemoryStore
// ============================================================================

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory store. Expired entries are dropped on access and by a periodic
/// sweep piggybacked on writes.
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, Entry>>,
    gc_interval: Duration,
    last_gc: Mutex<Instant>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_GC_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new(gc_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            gc_interval,
            last_gc: Mutex::new(Instant::now()),
        }
    }

    /// Number of entries currently held, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn sweep_if_due(&self, now: Instant) {
        let mut last_gc = self.last_gc.lock();
        if now.duration_since(*last_gc) < self.gc_interval {
            return;
        }
        *last_gc = now;
        self.entries.lock().retain(|_, entry| entry.is_live(now));
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep_if_due(now);
        self.entries.lock().insert(
            key.to_owned(),
            Entry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().clear();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Variables;
    use serde_json::json;
    use std::sync::Arc;

    fn scope_with(key: &str, value: serde_json::Value) -> Scope {
        let mut vars = Variables::new();
        vars.insert(key.into(), value);
        Scope::new(Arc::default(), vars)
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::default();
        store.set("k", b"value", DEFAULT_TTL).unwrap();

        assert_eq!(store.get("k").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_missing() {
        let store = MemoryStore::default();
        store.set("k", b"value", Duration::ZERO).unwrap();

        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_removes_expired() {
        let store = MemoryStore::new(Duration::ZERO);
        store.set("old", b"1", Duration::ZERO).unwrap();
        store.set("new", b"2", DEFAULT_TTL).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::default();
        store.set("a", b"1", DEFAULT_TTL).unwrap();
        store.set("b", b"2", DEFAULT_TTL).unwrap();
        store.clear().unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_fingerprint_format() {
        let key = fingerprint("pages/home", &Scope::default());

        assert!(key.starts_with("html-"));
        assert_eq!(key.len(), "html-".len() + 64);
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint("pages/home", &scope_with("x", json!(1)));
        let b = fingerprint("pages/home", &scope_with("x", json!(1)));

        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_with_scope() {
        let a = fingerprint("pages/home", &scope_with("x", json!(1)));
        let b = fingerprint("pages/home", &scope_with("x", json!(2)));

        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_with_template() {
        let scope = scope_with("x", json!(1));

        assert_ne!(
            fingerprint("pages/home", &scope),
            fingerprint("pages/about", &scope)
        );
    }
}
