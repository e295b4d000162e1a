//! Immutable ensemble settings.

use super::strategy::{ConsensusMethod, Strategy, StreamingConsensus};
use super::threshold::SimilarityThreshold;
use crate::core::error::ConfigurationError;
use std::time::Duration;

/// Everything about an ensemble except the responders themselves.
///
/// Settings are plain data; an orchestrator copies them at construction and
/// never mutates them afterwards. "Changing" a setting means building a new
/// orchestrator value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnsembleSettings {
    pub strategy: Strategy,
    pub consensus_method: ConsensusMethod,
    pub similarity_threshold: SimilarityThreshold,
    /// Index of the responder tried first by [`Strategy::Primary`]
    pub primary_index: usize,
    pub streaming_consensus: StreamingConsensus,
    /// Upper bound for a single responder invocation
    pub responder_timeout: Option<Duration>,
}

impl EnsembleSettings {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Validate the settings against the number of configured responders.
    pub fn validate(&self, responder_count: usize) -> Result<(), ConfigurationError> {
        if responder_count == 0 {
            return Err(ConfigurationError::NoResponders);
        }
        if self.primary_index >= responder_count {
            return Err(ConfigurationError::PrimaryIndexOutOfRange {
                index: self.primary_index,
                len: responder_count,
            });
        }
        Ok(())
    }

    /// Threshold the active consensus method clusters with.
    ///
    /// Majority always uses its fixed internal threshold; Similarity and
    /// Weighted use the configured one.
    pub fn clustering_threshold(&self) -> SimilarityThreshold {
        match self.consensus_method {
            ConsensusMethod::Majority => SimilarityThreshold::MAJORITY,
            ConsensusMethod::Similarity | ConsensusMethod::Weighted => self.similarity_threshold,
        }
    }

    /// Order in which [`Strategy::Primary`] tries responders.
    ///
    /// Starts at the primary and wraps around the configured list.
    pub fn primary_order(&self, responder_count: usize) -> Vec<usize> {
        (0..responder_count)
            .map(|offset| (self.primary_index + offset) % responder_count)
            .collect()
    }
}
