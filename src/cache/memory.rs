//! In-memory output cache.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::OutputCache;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    /// A ttl too large to represent as an instant never expires.
    fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// A thread-safe, process-local output cache.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl OutputCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let entry = self.inner.get(key)?;
        if entry.is_live(now) {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.inner.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) {
        self.inner.insert(key.to_string(), Entry::new(value, ttl));
    }

    fn replace(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> bool {
        match self.inner.get_mut(key) {
            Some(mut entry) if entry.is_live(Instant::now()) => {
                *entry = Entry::new(value, ttl);
                true
            }
            _ => false,
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|r| r.value().is_live(now))
            .map(|r| r.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Purged expired cache entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_operations() {
        let cache = MemoryCache::new();
        assert!(cache.get("blog_post").is_none());

        cache.set("blog_post", Bytes::from_static(b"<p>hi</p>"), None);
        assert_eq!(cache.get("blog_post").unwrap(), Bytes::from_static(b"<p>hi</p>"));
        assert_eq!(cache.len(), 1);

        assert!(cache.delete("blog_post"));
        assert!(!cache.delete("blog_post"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_requires_existing_key() {
        let cache = MemoryCache::new();
        assert!(!cache.replace("k", Bytes::from_static(b"v"), None));
        assert!(cache.get("k").is_none());

        cache.set("k", Bytes::from_static(b"v1"), None);
        assert!(cache.replace("k", Bytes::from_static(b"v2"), None));
        assert_eq!(cache.get("k").unwrap(), Bytes::from_static(b"v2"));
    }

    #[test]
    fn test_expiry() {
        let cache = MemoryCache::new();
        cache.set("short", Bytes::from_static(b"v"), Some(Duration::from_millis(20)));
        cache.set("long", Bytes::from_static(b"v"), None);
        assert!(cache.get("short").is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("short").is_none());
        assert!(!cache.replace("short", Bytes::from_static(b"w"), None));
        assert_eq!(cache.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("k", Bytes::from_static(b"v"), Some(Duration::from_secs(u64::MAX)));
        assert!(cache.get("k").is_some());
        assert!(cache.replace("k", Bytes::from_static(b"w"), Some(Duration::MAX)));
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.get("k").unwrap(), Bytes::from_static(b"w"));
    }

    #[test]
    fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("a", Bytes::from_static(b"1"), Some(Duration::from_millis(10)));
        cache.set("b", Bytes::from_static(b"2"), Some(Duration::from_millis(10)));
        cache.set("c", Bytes::from_static(b"3"), None);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = MemoryCache::new();
        let other = cache.clone();
        cache.set("k", Bytes::from_static(b"v"), None);
        assert!(other.get("k").is_some());
    }
}
