//! Similarity cache counters

use ensemble_domain::CacheObserver;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts similarity cache hits, misses and clears.
///
/// Attach with [`SimilarityCache::with_observer`](ensemble_domain::SimilarityCache::with_observer).
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    clears: AtomicU64,
    evicted: AtomicU64,
}

/// Point-in-time copy of [`AtomicCacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub clears: u64,
    pub evicted: u64,
}

impl CacheStatsSnapshot {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups answered from the cache, `None` before any lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        match self.lookups() {
            0 => None,
            n => Some(self.hits as f64 / n as f64),
        }
    }
}

impl AtomicCacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl CacheObserver for AtomicCacheStats {
    fn on_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_clear(&self, evicted: usize) {
        self.clears.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::SimilarityCache;
    use std::sync::Arc;

    #[test]
    fn test_counts_cache_traffic() {
        let stats = Arc::new(AtomicCacheStats::new());
        let cache = SimilarityCache::with_observer(stats.clone());

        let first = cache.similarity("Paris is the capital", "The capital is Paris");
        let second = cache.similarity("The capital is Paris", "Paris is the capital");
        assert_eq!(first, second);

        cache.clear();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.clears, 1);
        assert_eq!(snapshot.evicted, 1);
        assert_eq!(snapshot.hit_rate(), Some(0.5));
    }

    #[test]
    fn test_hit_rate_before_any_lookup() {
        assert_eq!(AtomicCacheStats::new().snapshot().hit_rate(), None);
    }
}
