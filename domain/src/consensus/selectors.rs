//! Consensus selectors
//!
//! Each selector clusters the candidate pool (see [`cluster_candidates`]) and
//! then picks a winning group:
//!
//! | Selector | Threshold | Winning group | Tie-break |
//! |----------|-----------|---------------|-----------|
//! | [`select_majority`] | fixed 0.5 | most members | lowest average elapsed, then first seen |
//! | [`select_by_similarity`] | caller's | most members | lowest average elapsed, then first seen |
//! | [`select_weighted`] | caller's | highest summed weight | lowest summed elapsed, then first seen |
//!
//! The winner is the group's fastest member. Candidates must be passed in a
//! stable order (the dispatcher uses configured responder order) so that the
//! outcome never depends on which responder happened to finish first.

use super::cache::SimilarityCache;
use super::clustering::{Cluster, cluster_candidates};
use super::decision::{ConsensusDecision, GroupSummary};
use crate::core::error::ConsensusError;
use crate::ensemble::result::CollectedResult;
use crate::ensemble::strategy::ConsensusMethod;
use crate::ensemble::threshold::SimilarityThreshold;

/// Weight sums closer than this are treated as equal.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Largest group of similar answers wins, using the fixed majority threshold.
pub fn select_majority(
    candidates: &[CollectedResult],
    cache: &SimilarityCache,
) -> Result<ConsensusDecision, ConsensusError> {
    select_by_count(
        ConsensusMethod::Majority,
        candidates,
        SimilarityThreshold::MAJORITY,
        cache,
    )
}

/// Largest group wins, clustering with a caller-supplied threshold.
///
/// A threshold close to 1.0 only merges (near-)identical answers; in the
/// extreme every candidate is its own singleton group and the fastest
/// first-seen answer wins.
pub fn select_by_similarity(
    candidates: &[CollectedResult],
    threshold: SimilarityThreshold,
    cache: &SimilarityCache,
) -> Result<ConsensusDecision, ConsensusError> {
    select_by_count(ConsensusMethod::Similarity, candidates, threshold, cache)
}

/// Group with the highest summed responder weight wins.
///
/// One heavily weighted responder can outvote several light ones. Groups
/// with zero total weight never win; if every group weighs zero the call
/// fails with [`ConsensusError::NoWeightedGroup`].
pub fn select_weighted(
    candidates: &[CollectedResult],
    threshold: SimilarityThreshold,
    cache: &SimilarityCache,
) -> Result<ConsensusDecision, ConsensusError> {
    let clusters = cluster_candidates(candidates, threshold, cache);
    if clusters.is_empty() {
        return Err(ConsensusError::EmptyCandidatePool);
    }

    let mut best: Option<usize> = None;
    for (i, cluster) in clusters.iter().enumerate() {
        if cluster.total_weight() <= WEIGHT_EPSILON {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => {
                let current = &clusters[b];
                let diff = cluster.total_weight() - current.total_weight();
                diff > WEIGHT_EPSILON
                    || (diff.abs() <= WEIGHT_EPSILON
                        && cluster.total_elapsed() < current.total_elapsed())
            }
        };
        if better {
            best = Some(i);
        }
    }

    let winner = best.ok_or(ConsensusError::NoWeightedGroup)?;
    Ok(decide(ConsensusMethod::Weighted, threshold, &clusters, winner))
}

/// Run the selector for `method`.
///
/// `threshold` is ignored by [`ConsensusMethod::Majority`], which always
/// clusters with [`SimilarityThreshold::MAJORITY`].
pub fn select(
    method: ConsensusMethod,
    candidates: &[CollectedResult],
    threshold: SimilarityThreshold,
    cache: &SimilarityCache,
) -> Result<ConsensusDecision, ConsensusError> {
    match method {
        ConsensusMethod::Majority => select_majority(candidates, cache),
        ConsensusMethod::Similarity => select_by_similarity(candidates, threshold, cache),
        ConsensusMethod::Weighted => select_weighted(candidates, threshold, cache),
    }
}

fn select_by_count(
    method: ConsensusMethod,
    candidates: &[CollectedResult],
    threshold: SimilarityThreshold,
    cache: &SimilarityCache,
) -> Result<ConsensusDecision, ConsensusError> {
    let clusters = cluster_candidates(candidates, threshold, cache);
    if clusters.is_empty() {
        return Err(ConsensusError::EmptyCandidatePool);
    }

    let mut best = 0;
    for (i, cluster) in clusters.iter().enumerate().skip(1) {
        let current = &clusters[best];
        let better = cluster.len() > current.len()
            || (cluster.len() == current.len()
                && cluster.average_elapsed() < current.average_elapsed());
        if better {
            best = i;
        }
    }

    Ok(decide(method, threshold, &clusters, best))
}

fn decide(
    method: ConsensusMethod,
    threshold: SimilarityThreshold,
    clusters: &[Cluster<'_>],
    winning_group: usize,
) -> ConsensusDecision {
    ConsensusDecision {
        method,
        threshold: threshold.value(),
        winner: clusters[winning_group].representative().clone(),
        groups: clusters.iter().map(GroupSummary::from_cluster).collect(),
        winning_group,
    }
}
