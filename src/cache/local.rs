use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;

use crate::types::{Identifier, SystemMetadata};

/// Bounded in-memory cache with LRU eviction.
///
/// A capacity of `0` disables the cache: lookups always miss and inserts
/// are dropped.
#[derive(Debug)]
pub struct LocalCache<K: Hash + Eq, V> {
    entries: Option<Mutex<LruCache<K, V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

pub type ObjectCache = LocalCache<Identifier, Bytes>;
pub type SystemMetadataCache = LocalCache<Identifier, SystemMetadata>;

impl<K: Hash + Eq, V: Clone> LocalCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        LocalCache {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let value = self
            .entries
            .as_ref()
            .and_then(|entries| entries.lock().get(key).cloned());

        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };

        value
    }

    /// Looks up an entry without counting it or refreshing its recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().peek(key).cloned())
    }

    pub fn insert(&self, key: K, value: V) {
        if let Some(entries) = &self.entries {
            entries.lock().put(key, value);
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().pop(key))
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (size, capacity) = self
            .entries
            .as_ref()
            .map(|entries| {
                let entries = entries.lock();
                (entries.len(), entries.cap().get())
            })
            .unwrap_or((0, 0));

        CacheStats {
            size,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_eviction() {
        let cache: ObjectCache = LocalCache::new(2);
        cache.insert("a".into(), Bytes::from_static(b"1"));
        cache.insert("b".into(), Bytes::from_static(b"2"));

        // Touch "a" so "b" is the least recently used
        assert!(cache.get(&"a".into()).is_some());
        cache.insert("c".into(), Bytes::from_static(b"3"));

        assert!(cache.get(&"b".into()).is_none());
        assert_eq!(cache.get(&"c".into()).unwrap(), Bytes::from_static(b"3"));

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache: LocalCache<String, u32> = LocalCache::new(0);
        cache.insert("a".to_string(), 1);

        assert!(!cache.is_enabled());
        assert!(cache.get(&"a".to_string()).is_none());
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: LocalCache<String, u32> = LocalCache::new(4);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);

        assert_eq!(cache.remove(&"a".to_string()), Some(1));
        assert_eq!(cache.remove(&"a".to_string()), None);

        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }
}
