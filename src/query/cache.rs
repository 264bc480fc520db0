use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered identifier lists of evaluated queries.
///
/// Keys carry the index generation they were computed at, so any publish
/// makes older entries unreachable; they age out through the LRU.
pub struct QueryCache {
    pub cache: Mutex<LruCache<QueryKey, Arc<Vec<String>>>>,
    pub size_limit: usize,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub generation: u64,
    pub query: String, // canonical constraint, type names and sort keys
}

impl QueryCache {
    pub fn new(size_limit: usize) -> Self {
        let cap = NonZeroUsize::new(size_limit).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            cache: Mutex::new(LruCache::new(cap)),
            size_limit: cap.get(),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<Arc<Vec<String>>> {
        let mut cache = self.cache.lock();
        if let Some(identifiers) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(identifiers))
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: QueryKey, identifiers: Arc<Vec<String>>) {
        self.cache.lock().put(key, identifiers);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.size_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(generation: u64) -> QueryKey {
        QueryKey {
            generation,
            query: "Language = 'eng'".to_string(),
        }
    }

    #[test]
    fn generation_separates_entries() {
        let cache = QueryCache::new(4);
        cache.put(key(1), Arc::new(vec!["a".to_string()]));

        assert_eq!(cache.get(&key(1)).unwrap().as_slice(), &["a".to_string()]);
        assert!(cache.get(&key(2)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = QueryCache::new(1);
        cache.put(key(1), Arc::new(Vec::new()));
        cache.put(key(2), Arc::new(Vec::new()));
        assert!(cache.get(&key(1)).is_none());
        assert_eq!(cache.stats().size, 1);
    }
}
