//! Consensus over a pool of responder answers
//!
//! Everything here is synchronous and free of I/O so the algorithms can be
//! exercised directly by tests and benchmarks without any dispatch.
//!
//! # Pipeline
//!
//! ```text
//! CollectedResult pool ──► cluster_candidates ──► winning group ──► representative
//!                              │
//!                              └── SimilarityCache::similarity (memoized pairwise scores)
//! ```
//!
//! - [`similarity`]: pure, symmetric text similarity in `[0, 1]`
//! - [`cache`]: concurrency-safe memoization of pairwise scores
//! - [`clustering`]: grouping of mutually similar answers
//! - [`selectors`]: majority, similarity and weighted selection
//! - [`decision`]: the resulting [`ConsensusDecision`]

pub mod cache;
pub mod clustering;
pub mod decision;
pub mod selectors;
pub mod similarity;

pub use cache::{
    CacheObserver, NoopObserver, PairKey, SimilarityCache, calculate_similarity,
    reset_similarity_cache,
};
pub use clustering::{Cluster, cluster_candidates, select_best_from_group};
pub use decision::{ConsensusDecision, GroupSummary};
pub use selectors::{select, select_by_similarity, select_majority, select_weighted};
pub use similarity::compute_similarity;
