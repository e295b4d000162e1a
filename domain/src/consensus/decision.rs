//! Consensus decision value objects

use super::clustering::Cluster;
use crate::ensemble::result::{CollectedResult, duration_millis};
use crate::ensemble::strategy::ConsensusMethod;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of one similarity group considered during a vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Responder names, in candidate order
    pub members: Vec<String>,
    /// Name of the member chosen to represent the group
    pub representative: String,
    pub total_weight: f64,
    #[serde(rename = "total_elapsed_ms", with = "duration_millis")]
    pub total_elapsed: Duration,
}

impl GroupSummary {
    pub(crate) fn from_cluster(cluster: &Cluster<'_>) -> Self {
        Self {
            members: cluster
                .members()
                .iter()
                .map(|m| m.responder.clone())
                .collect(),
            representative: cluster.representative().responder.clone(),
            total_weight: cluster.total_weight(),
            total_elapsed: cluster.total_elapsed(),
        }
    }
}

/// Result of running a consensus selector over a candidate pool
///
/// # Example
///
/// ```
/// use ensemble_domain::consensus::{SimilarityCache, select_majority};
/// use ensemble_domain::CollectedResult;
/// use std::time::Duration;
///
/// let pool = vec![
///     CollectedResult::success("a", 0, "Paris is the capital of France.", Duration::from_millis(20), 1.0),
///     CollectedResult::success("b", 1, "The capital of France is Paris.", Duration::from_millis(10), 1.0),
///     CollectedResult::success("c", 2, "Berlin is the capital of Germany.", Duration::from_millis(5), 1.0),
/// ];
///
/// let decision = select_majority(&pool, &SimilarityCache::new()).unwrap();
/// assert_eq!(decision.winner.responder, "b"); // fastest member of the 2-vote group
/// assert_eq!(decision.agreement(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub method: ConsensusMethod,
    /// Clustering threshold that was applied
    pub threshold: f64,
    /// Representative of the winning group
    pub winner: CollectedResult,
    /// Every group, in first-seen order
    pub groups: Vec<GroupSummary>,
    /// Index into `groups` of the winning group
    pub winning_group: usize,
}

impl ConsensusDecision {
    /// Number of responders in the winning group
    pub fn agreement(&self) -> usize {
        self.groups
            .get(self.winning_group)
            .map(|g| g.members.len())
            .unwrap_or(0)
    }

    /// Whether every candidate landed in the same group
    pub fn is_unanimous(&self) -> bool {
        self.groups.len() == 1
    }

    /// Visual vote summary, e.g. `[●●○]` for a 2-of-3 agreement
    pub fn vote_summary(&self) -> String {
        let mut summary = String::from("[");
        for (i, group) in self.groups.iter().enumerate() {
            let mark = if i == self.winning_group { '●' } else { '○' };
            for _ in &group.members {
                summary.push(mark);
            }
        }
        summary.push(']');
        summary
    }
}
