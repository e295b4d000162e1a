//! Ensemble configuration from TOML (`[ensemble]` section)

use ensemble_domain::{
    ConfigIssue, ConfigIssueCode, ConsensusMethod, EnsembleSettings, SimilarityThreshold,
    Strategy, StreamingConsensus,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Raw ensemble configuration from TOML
///
/// Enum-like fields are kept as strings so that a typo degrades to a
/// warning and a default instead of refusing to load the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEnsembleConfig {
    /// Dispatch strategy: "fastest" | "primary" | "consensus"
    pub strategy: String,
    /// Consensus method: "majority" | "similarity" | "weighted"
    pub method: String,
    /// Clustering threshold for similarity and weighted voting
    pub similarity_threshold: f64,
    /// Index of the primary responder
    pub primary: usize,
    /// Streaming under consensus: "materialize" | "disallow"
    pub streaming_consensus: String,
    /// Deadline for a whole call, in milliseconds
    pub timeout_ms: Option<u64>,
    /// Upper bound for a single responder invocation, in milliseconds
    pub responder_timeout_ms: Option<u64>,
    /// Stored similarity pairs before the cache is flushed (unbounded if unset)
    pub cache_max_entries: Option<usize>,
}

impl Default for FileEnsembleConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default().as_str().to_string(),
            method: ConsensusMethod::default().as_str().to_string(),
            similarity_threshold: SimilarityThreshold::DEFAULT.value(),
            primary: 0,
            streaming_consensus: StreamingConsensus::default().as_str().to_string(),
            timeout_ms: None,
            responder_timeout_ms: None,
            cache_max_entries: None,
        }
    }
}

impl FileEnsembleConfig {
    /// Parse strategy, returning the value and any validation issues.
    pub fn parse_strategy(&self) -> (Strategy, Vec<ConfigIssue>) {
        parse_enum(
            "ensemble.strategy",
            &self.strategy,
            &["fastest", "primary", "consensus"],
        )
    }

    /// Parse consensus method, returning the value and any validation issues.
    pub fn parse_method(&self) -> (ConsensusMethod, Vec<ConfigIssue>) {
        parse_enum(
            "ensemble.method",
            &self.method,
            &["majority", "similarity", "weighted"],
        )
    }

    /// Parse streaming consensus mode, returning the value and any validation issues.
    pub fn parse_streaming_consensus(&self) -> (StreamingConsensus, Vec<ConfigIssue>) {
        parse_enum(
            "ensemble.streaming_consensus",
            &self.streaming_consensus,
            &["materialize", "disallow"],
        )
    }

    /// Parse similarity threshold, returning the value and any validation issues.
    pub fn parse_threshold(&self) -> (SimilarityThreshold, Vec<ConfigIssue>) {
        match SimilarityThreshold::new(self.similarity_threshold) {
            Ok(threshold) => (threshold, vec![]),
            Err(_) => {
                let fallback = SimilarityThreshold::DEFAULT;
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidThreshold {
                        value: self.similarity_threshold,
                    },
                    format!(
                        "ensemble.similarity_threshold: {} is outside (0, 1], falling back to {}",
                        self.similarity_threshold, fallback
                    ),
                );
                (fallback, vec![issue])
            }
        }
    }

    /// Deadline for a whole call
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Convert into domain settings, collecting every issue on the way.
    pub fn to_settings(&self) -> (EnsembleSettings, Vec<ConfigIssue>) {
        let (strategy, mut issues) = self.parse_strategy();
        let (consensus_method, method_issues) = self.parse_method();
        let (similarity_threshold, threshold_issues) = self.parse_threshold();
        let (streaming_consensus, streaming_issues) = self.parse_streaming_consensus();
        issues.extend(method_issues);
        issues.extend(threshold_issues);
        issues.extend(streaming_issues);

        let settings = EnsembleSettings {
            strategy,
            consensus_method,
            similarity_threshold,
            primary_index: self.primary,
            streaming_consensus,
            responder_timeout: self.responder_timeout_ms.map(Duration::from_millis),
        };
        (settings, issues)
    }
}

/// Parse an enum field, falling back to its default with a warning.
fn parse_enum<T>(field: &str, value: &str, valid_values: &[&str]) -> (T, Vec<ConfigIssue>)
where
    T: FromStr + Default + std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(parsed) => (parsed, vec![]),
        Err(_) => {
            let fallback = T::default();
            let issue = ConfigIssue::warning(
                ConfigIssueCode::InvalidEnumValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    valid_values: valid_values.iter().map(|v| v.to_string()).collect(),
                },
                format!(
                    "{}: unknown value '{}', falling back to '{}'",
                    field, value, fallback
                ),
            );
            (fallback, vec![issue])
        }
    }
}
