//! Dispatch strategy and consensus method value objects.

use crate::core::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// How an ensemble dispatches a call to its responders.
///
/// - `Fastest`: all responders race, the first success wins
/// - `Primary`: the primary responder is tried first, then the others in order
/// - `Consensus`: all responders are asked and a selector votes on the answers
///
/// # Example
///
/// ```
/// use ensemble_domain::Strategy;
///
/// let strategy: Strategy = "consensus".parse().unwrap();
/// assert_eq!(strategy, Strategy::Consensus);
/// assert_eq!(strategy.to_string(), "consensus");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Fastest,
    #[default]
    Primary,
    Consensus,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Fastest => "fastest",
            Strategy::Primary => "primary",
            Strategy::Consensus => "consensus",
        }
    }

    /// Whether this strategy waits for every responder before answering
    pub fn waits_for_all(&self) -> bool {
        matches!(self, Strategy::Consensus)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fastest" | "race" => Ok(Strategy::Fastest),
            "primary" | "fallback" => Ok(Strategy::Primary),
            "consensus" | "vote" => Ok(Strategy::Consensus),
            other => Err(ConfigurationError::UnknownStrategy(other.to_string())),
        }
    }
}

/// How the Consensus strategy reduces a candidate pool to one answer.
///
/// Only meaningful when the strategy is [`Strategy::Consensus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusMethod {
    /// Largest group of mutually similar answers wins
    #[default]
    Majority,
    /// Like majority, with a caller-supplied similarity threshold
    Similarity,
    /// Group with the highest summed responder weight wins
    Weighted,
}

impl ConsensusMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMethod::Majority => "majority",
            ConsensusMethod::Similarity => "similarity",
            ConsensusMethod::Weighted => "weighted",
        }
    }
}

impl std::fmt::Display for ConsensusMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsensusMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "majority" => Ok(ConsensusMethod::Majority),
            "similarity" => Ok(ConsensusMethod::Similarity),
            "weighted" => Ok(ConsensusMethod::Weighted),
            other => Err(ConfigurationError::UnknownConsensusMethod(
                other.to_string(),
            )),
        }
    }
}

/// What the Consensus strategy does with streaming calls.
///
/// Voting needs complete answers, so a streaming consensus call either
/// materializes every stream before voting or is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamingConsensus {
    /// Collect every stream to completion, vote, then emit the winner
    #[default]
    Materialize,
    /// Reject streaming calls with a configuration error
    Disallow,
}

impl StreamingConsensus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingConsensus::Materialize => "materialize",
            StreamingConsensus::Disallow => "disallow",
        }
    }
}

impl std::fmt::Display for StreamingConsensus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamingConsensus {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "materialize" => Ok(StreamingConsensus::Materialize),
            "disallow" => Ok(StreamingConsensus::Disallow),
            other => Err(ConfigurationError::UnknownStreamingConsensus(
                other.to_string(),
            )),
        }
    }
}
