//! Runtime counters

mod cache_stats;

pub use cache_stats::{AtomicCacheStats, CacheStatsSnapshot};
