//! Handler output caching.
//!
//! # Data Flow
//! ```text
//! Dispatch of route "blog/post":
//!     → key "blog_post"
//!     → get(key): non-empty hit returns immediately (handler not run)
//!     → miss: handler runs, output captured
//!     → policy Forever / Ttl(n): replace(key), falling back to set(key)
//! ```
//!
//! # Design Decisions
//! - The store is a trait so a shared external cache can replace the
//!   in-memory one without touching the dispatcher
//! - replace-then-set is not atomic; concurrent writers of one key may
//!   lose an update, which is fine for a soft cache
//! - Store failures are not modeled: a backend that cannot answer behaves
//!   like a miss

pub mod memory;

use bytes::Bytes;
use std::fmt::Debug;
use std::time::Duration;

pub use memory::MemoryCache;

/// Key under which the output of `route_uri` is stored (`blog/post` → `blog_post`).
pub fn cache_key(route_uri: &str) -> String {
    route_uri.replace('/', "_")
}

/// A key-value store for rendered handler output.
pub trait OutputCache: Send + Sync + Debug {
    /// Get a value by key. Expired entries are absent.
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Insert or overwrite a value. `ttl` of `None` never expires.
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>);

    /// Overwrite an existing value. Returns false if the key was absent.
    fn replace(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> bool;

    /// Remove a value. Returns true if something was removed.
    fn delete(&self, key: &str) -> bool;

    /// Approximate number of stored entries.
    fn len(&self) -> usize;

    /// Keys of all live entries, sorted.
    fn keys(&self) -> Vec<String>;

    /// Drop expired entries, returning how many were removed.
    ///
    /// Stores that expire entries on their own can keep the default.
    fn purge_expired(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether and for how long a handler's output should be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Do not cache.
    #[default]
    Disabled,
    /// Cache until explicitly purged.
    Forever,
    /// Cache for a fixed duration.
    Ttl(Duration),
}

impl CachePolicy {
    /// Cache for `secs` seconds. Zero means forever.
    pub fn seconds(secs: u64) -> Self {
        if secs == 0 {
            Self::Forever
        } else {
            Self::Ttl(Duration::from_secs(secs))
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Expiry to hand to the store, `None` when caching is disabled.
    pub fn expiry(&self) -> Option<Option<Duration>> {
        match self {
            Self::Disabled => None,
            Self::Forever => Some(None),
            Self::Ttl(ttl) => Some(Some(*ttl)),
        }
    }
}

impl From<bool> for CachePolicy {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Forever
        } else {
            Self::Disabled
        }
    }
}

/// Store `value` under `key`, preferring an in-place replace.
///
/// Returns true when the key already existed.
pub fn store(cache: &dyn OutputCache, key: &str, value: Bytes, ttl: Option<Duration>) -> bool {
    if cache.replace(key, value.clone(), ttl) {
        return true;
    }
    cache.set(key, value, ttl);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("blog/post"), "blog_post");
        assert_eq!(cache_key("blog/admin/edit"), "blog_admin_edit");
    }

    #[test]
    fn test_policy() {
        assert_eq!(CachePolicy::seconds(0), CachePolicy::Forever);
        assert_eq!(CachePolicy::seconds(300), CachePolicy::Ttl(Duration::from_secs(300)));
        assert_eq!(CachePolicy::from(true), CachePolicy::Forever);
        assert_eq!(CachePolicy::Disabled.expiry(), None);
        assert_eq!(CachePolicy::Forever.expiry(), Some(None));
        assert!(!CachePolicy::default().is_enabled());
    }

    #[test]
    fn test_store_replaces_then_sets() {
        let cache = MemoryCache::new();
        assert!(!store(&cache, "k", Bytes::from_static(b"one"), None));
        assert!(store(&cache, "k", Bytes::from_static(b"two"), None));
        assert_eq!(cache.get("k").unwrap(), Bytes::from_static(b"two"));
    }
}
