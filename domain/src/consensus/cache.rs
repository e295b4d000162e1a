//! Similarity cache
//!
//! Memoizes pairwise similarity scores under an order-independent key so
//! `(a, b)` and `(b, a)` share one entry. Entries are idempotent: a key always
//! maps to the same score, so concurrent writers racing on the same key are
//! harmless and no transactional semantics are needed.
//!
//! A process-wide instance is available through [`SimilarityCache::global`]
//! for convenience, but every consensus algorithm takes the cache by
//! reference, so tests and embedders can use isolated instances.
//!
//! A cache is unbounded unless built with
//! [`with_max_entries`](SimilarityCache::with_max_entries); a bounded cache
//! that is full is flushed before the next new pair is stored.

use super::similarity::compute_similarity;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

static GLOBAL_CACHE: LazyLock<Arc<SimilarityCache>> =
    LazyLock::new(|| Arc::new(SimilarityCache::new()));

/// Receives cache hit/miss notifications.
///
/// Lets a metrics backend count cache effectiveness without the cache
/// depending on that backend.
pub trait CacheObserver: Send + Sync {
    /// A lookup found a stored score
    fn on_hit(&self);

    /// A lookup found nothing
    fn on_miss(&self);

    /// The cache was cleared, dropping `evicted` entries
    fn on_clear(&self, _evicted: usize) {}
}

/// Observer that ignores every notification
pub struct NoopObserver;

impl CacheObserver for NoopObserver {
    fn on_hit(&self) {}
    fn on_miss(&self) {}
}

/// Unordered key for a pair of texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey(u64, u64);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (ha, hb) = (hash_text(a), hash_text(b));
        if ha <= hb {
            PairKey(ha, hb)
        } else {
            PairKey(hb, ha)
        }
    }
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Concurrency-safe memoization of similarity scores.
pub struct SimilarityCache {
    entries: RwLock<HashMap<PairKey, f64>>,
    observer: Arc<dyn CacheObserver>,
    max_entries: Option<usize>,
}

impl SimilarityCache {
    /// Create an empty cache with no observer.
    pub fn new() -> Self {
        Self::with_observer(Arc::new(NoopObserver))
    }

    /// Create an empty cache that reports hits and misses to `observer`.
    pub fn with_observer(observer: Arc<dyn CacheObserver>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            observer,
            max_entries: None,
        }
    }

    /// Cap the number of stored pairs. Zero disables storage entirely.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// The process-wide default cache.
    ///
    /// It has no size bound and only shrinks through
    /// [`reset_similarity_cache`]. Long-lived embedders comparing unbounded
    /// input should pass their own bounded instance instead.
    pub fn global() -> &'static Arc<SimilarityCache> {
        &GLOBAL_CACHE
    }

    /// Look up a stored score, notifying the observer of the hit or miss.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let key = PairKey::new(a, b);
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        match found {
            Some(_) => self.observer.on_hit(),
            None => self.observer.on_miss(),
        }
        found
    }

    /// Store a score for the pair. Scores are clamped to `[0, 1]`.
    pub fn set(&self, a: &str, b: &str, score: f64) {
        let key = PairKey::new(a, b);
        let flushed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let mut flushed = 0;
            if let Some(max_entries) = self.max_entries {
                if max_entries == 0 {
                    return;
                }
                if entries.len() >= max_entries && !entries.contains_key(&key) {
                    flushed = entries.len();
                    entries.clear();
                }
            }
            entries.insert(key, score.clamp(0.0, 1.0));
            flushed
        };
        if flushed > 0 {
            self.observer.on_clear(flushed);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let evicted = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let evicted = entries.len();
            entries.clear();
            evicted
        };
        self.observer.on_clear(evicted);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memoized similarity of two texts.
    ///
    /// Checks the cache first; on a miss the score is computed and stored.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        if let Some(score) = self.get(a, b) {
            return score;
        }
        let score = compute_similarity(a, b);
        self.set(a, b, score);
        score
    }
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimilarityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Similarity of two texts, memoized in the process-wide cache.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    SimilarityCache::global().similarity(a, b)
}

/// Clear the process-wide cache.
///
/// Safe to call while other threads read or write the cache; later lookups
/// simply recompute.
pub fn reset_similarity_cache() {
    SimilarityCache::global().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        hits: AtomicUsize,
        misses: AtomicUsize,
        evicted: AtomicUsize,
    }

    impl CacheObserver for CountingObserver {
        fn on_hit(&self) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        fn on_miss(&self) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        fn on_clear(&self, evicted: usize) {
            self.evicted.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(PairKey::new("a", "b"), PairKey::new("b", "a"));
        assert_ne!(PairKey::new("a", "b"), PairKey::new("a", "c"));
    }

    #[test]
    fn test_get_set_clear() {
        let cache = SimilarityCache::new();
        assert!(cache.get("x", "y").is_none());

        cache.set("x", "y", 0.4);
        assert_eq!(cache.get("y", "x"), Some(0.4));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("x", "y").is_none());
    }

    #[test]
    fn test_bounded_cache_flushes_when_full() {
        let observer = Arc::new(CountingObserver::default());
        let cache = SimilarityCache::with_observer(observer.clone()).with_max_entries(2);

        cache.set("a", "b", 0.1);
        cache.set("a", "c", 0.2);
        // Overwriting a stored pair never flushes
        cache.set("c", "a", 0.3);
        assert_eq!(cache.len(), 2);
        assert_eq!(observer.evicted.load(Ordering::Relaxed), 0);

        cache.set("b", "c", 0.4);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b", "c"), Some(0.4));
        assert!(cache.get("a", "b").is_none());
        assert_eq!(observer.evicted.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_zero_bound_stores_nothing() {
        let cache = SimilarityCache::new().with_max_entries(0);
        let score = cache.similarity("one two", "two three");
        assert_eq!(score, compute_similarity("one two", "two three"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_clamps_scores() {
        let cache = SimilarityCache::new();
        cache.set("x", "y", 1.7);
        assert_eq!(cache.get("x", "y"), Some(1.0));
    }

    #[test]
    fn test_similarity_memoizes_and_reports() {
        let observer = Arc::new(CountingObserver::default());
        let cache = SimilarityCache::with_observer(observer.clone());

        let first = cache.similarity("alpha beta", "beta alpha gamma");
        let second = cache.similarity("beta alpha gamma", "alpha beta");

        assert_eq!(first, second);
        assert_eq!(observer.misses.load(Ordering::Relaxed), 1);
        assert_eq!(observer.hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert_eq!(observer.evicted.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_reset_then_recompute_gives_same_value() {
        let a = "Berlin is the capital of Germany.";
        let b = "Germany's capital is Berlin.";
        let warm = calculate_similarity(a, b);
        assert_eq!(calculate_similarity(a, b), warm);

        reset_similarity_cache();
        assert_eq!(calculate_similarity(b, a), warm);
    }

    #[test]
    fn test_concurrent_access_is_consistent() {
        let cache = SimilarityCache::new();
        let texts = ["one two three", "two three four", "three four five", "one five"];
        let expected: Vec<f64> = texts
            .iter()
            .flat_map(|a| texts.iter().map(move |b| compute_similarity(a, b)))
            .collect();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                let expected = &expected;
                scope.spawn(move || {
                    for round in 0..50 {
                        if worker == 0 && round % 10 == 0 {
                            cache.clear();
                        }
                        let got: Vec<f64> = texts
                            .iter()
                            .flat_map(|a| texts.iter().map(move |b| cache.similarity(a, b)))
                            .collect();
                        assert_eq!(&got, expected);
                    }
                });
            }
        });
    }
}
