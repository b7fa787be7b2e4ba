//! Content cache for splice.
//!
//! Fetched include content is memoized per origin in two disjoint
//! namespaces grouped by [`ContentCaches`]:
//!
//! - local: keyed by the normalized filesystem path that was read
//! - remote: keyed by the URL with any trailing slash removed
//!
//! Both namespaces are first-class objects. Callers may pre-seed, inspect,
//! invalidate or clear them at any time, and the engine reads through the
//! same store on every lookup, so edits made via [`ContentCache::store`] are
//! seen immediately.
//!
//! Entries never expire on their own. All access goes through an `RwLock`,
//! which makes a cache safe to share between engines on different threads;
//! cloning a [`ContentCache`] yields another handle to the same store.
//!
//! # Example
//!
//! ```
//! use splice_cache::ContentCaches;
//!
//! let caches = ContentCaches::new();
//! caches.local().put("docs/intro.md", "Hello");
//! assert_eq!(caches.local().get("docs/intro.md").as_deref(), Some("Hello"));
//!
//! caches.local().store().insert("docs/intro.md".to_owned(), "Seeded".to_owned());
//! assert_eq!(caches.local().get("docs/intro.md").as_deref(), Some("Seeded"));
//!
//! caches.local().clear();
//! assert!(caches.local().is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

/// Where included content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Filesystem.
    Local,
    /// Network.
    Remote,
}

impl Origin {
    /// Lowercase name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, mutable mapping from a resolved target to its decoded text.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl ContentCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up cached content.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store content, replacing any previous entry for `key`.
    pub fn put(&self, key: impl Into<String>, text: impl Into<String>) {
        self.store().insert(key.into(), text.into());
    }

    /// Remove a single entry, returning it if present.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.store().remove(key)
    }

    /// Remove every entry. Clearing an empty cache is a no-op.
    pub fn clear(&self) {
        let mut entries = self.store();
        if !entries.is_empty() {
            tracing::debug!(count = entries.len(), "Clearing content cache");
        }
        entries.clear();
    }

    /// Whether `key` has an entry.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live, writable view of the underlying mapping.
    ///
    /// This is the authoritative store, not a copy: inserts and removals made
    /// through the guard are what later lookups see. Hold the guard briefly;
    /// every other access to this cache blocks until it is dropped.
    pub fn store(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current entries.
    #[must_use]
    pub fn entries(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The local and remote cache namespaces of one engine.
///
/// Cloning yields handles to the same two stores, so one set of caches can
/// back several engines.
#[derive(Debug, Clone, Default)]
pub struct ContentCaches {
    local: ContentCache,
    remote: ContentCache,
}

impl ContentCaches {
    /// Create two empty namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache for filesystem content.
    #[must_use]
    pub fn local(&self) -> &ContentCache {
        &self.local
    }

    /// Cache for network content.
    #[must_use]
    pub fn remote(&self) -> &ContentCache {
        &self.remote
    }

    /// Namespace for `origin`.
    #[must_use]
    pub fn namespace(&self, origin: Origin) -> &ContentCache {
        match origin {
            Origin::Local => &self.local,
            Origin::Remote => &self.remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_put_and_get() {
        let cache = ContentCache::new();
        assert_eq!(cache.get("a.md"), None);

        cache.put("a.md", "alpha");
        assert_eq!(cache.get("a.md").as_deref(), Some("alpha"));
        assert!(cache.contains("a.md"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ContentCache::new();
        cache.put("a.md", "old");
        cache.put("a.md", "new");
        assert_eq!(cache.get("a.md").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_empty_is_noop() {
        let cache = ContentCache::new();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = ContentCache::new();
        cache.put("a.md", "alpha");
        cache.put("b.md", "beta");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a.md"), None);
    }

    #[test]
    fn test_store_is_live() {
        let cache = ContentCache::new();
        cache.put("a.md", "alpha");

        cache
            .store()
            .insert("a.md".to_owned(), "modified".to_owned());
        cache.store().insert("seeded.md".to_owned(), "seed".to_owned());

        assert_eq!(cache.get("a.md").as_deref(), Some("modified"));
        assert_eq!(cache.get("seeded.md").as_deref(), Some("seed"));
    }

    #[test]
    fn test_entries_is_a_copy() {
        let cache = ContentCache::new();
        cache.put("a.md", "alpha");

        let mut copy = cache.entries();
        copy.insert("b.md".to_owned(), "beta".to_owned());

        assert!(!cache.contains("b.md"));
    }

    #[test]
    fn test_clones_share_store() {
        let cache = ContentCache::new();
        let other = cache.clone();
        other.put("a.md", "alpha");
        assert_eq!(cache.get("a.md").as_deref(), Some("alpha"));
    }

    #[test]
    fn test_remove() {
        let cache = ContentCache::new();
        cache.put("a.md", "alpha");
        assert_eq!(cache.remove("a.md").as_deref(), Some("alpha"));
        assert_eq!(cache.remove("a.md"), None);
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let caches = ContentCaches::new();
        caches.local().put("key", "local");
        caches.remote().put("key", "remote");

        assert_eq!(caches.namespace(Origin::Local).get("key").as_deref(), Some("local"));
        assert_eq!(caches.namespace(Origin::Remote).get("key").as_deref(), Some("remote"));

        caches.local().clear();
        assert!(caches.local().is_empty());
        assert_eq!(caches.remote().len(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let caches = ContentCaches::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let caches = caches.clone();
                std::thread::spawn(move || caches.remote().put(format!("u{i}"), "x"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(caches.remote().len(), 4);
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::Local.to_string(), "local");
        assert_eq!(Origin::Remote.as_str(), "remote");
    }
}
