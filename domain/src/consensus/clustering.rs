//! Grouping of mutually similar answers.
//!
//! Candidates are visited in the order given. Each one joins the first
//! existing group whose every member is at least `threshold`-similar to it,
//! otherwise it opens a new group. Groups therefore come out in first-seen
//! order, and the result depends only on the input order, never on when
//! the answers arrived.

use super::cache::SimilarityCache;
use crate::ensemble::result::CollectedResult;
use crate::ensemble::threshold::SimilarityThreshold;
use std::time::Duration;

/// A non-empty group of mutually similar candidates.
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    members: Vec<&'a CollectedResult>,
}

impl<'a> Cluster<'a> {
    fn new(first: &'a CollectedResult) -> Self {
        Self {
            members: vec![first],
        }
    }

    pub fn members(&self) -> &[&'a CollectedResult] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.members.iter().map(|m| m.weight).sum()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.members.iter().map(|m| m.elapsed).sum()
    }

    pub fn average_elapsed(&self) -> Duration {
        self.total_elapsed() / self.members.len().max(1) as u32
    }

    /// The member whose wording stands for the whole group.
    pub fn representative(&self) -> &'a CollectedResult {
        // Clusters are created with one member and only grow
        select_best_from_group(&self.members).unwrap_or(self.members[0])
    }

    fn accepts(
        &self,
        candidate: &CollectedResult,
        threshold: SimilarityThreshold,
        cache: &SimilarityCache,
    ) -> bool {
        self.members
            .iter()
            .all(|m| threshold.admits(cache.similarity(&m.content, &candidate.content)))
    }
}

/// Partition the successful candidates into similarity groups.
///
/// Failed results are skipped.
pub fn cluster_candidates<'a>(
    candidates: &'a [CollectedResult],
    threshold: SimilarityThreshold,
    cache: &SimilarityCache,
) -> Vec<Cluster<'a>> {
    let mut clusters: Vec<Cluster<'a>> = Vec::new();

    for candidate in candidates.iter().filter(|c| c.is_success()) {
        match clusters
            .iter_mut()
            .find(|cluster| cluster.accepts(candidate, threshold, cache))
        {
            Some(cluster) => cluster.members.push(candidate),
            None => clusters.push(Cluster::new(candidate)),
        }
    }

    clusters
}

/// Pick a group's representative: the fastest member.
///
/// The fastest agreeing responder's exact wording is treated as canonical.
/// Equal elapsed times keep the earliest member. Returns `None` for an empty
/// group.
pub fn select_best_from_group<'a>(group: &[&'a CollectedResult]) -> Option<&'a CollectedResult> {
    group.iter().copied().min_by_key(|member| member.elapsed)
}
