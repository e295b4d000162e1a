//! Domain error types

use thiserror::Error;

/// Errors raised while validating an ensemble configuration.
///
/// These are detected at construction time, before any responder is called,
/// with the exception of [`ConfigurationError::StreamingConsensusDisabled`]
/// which depends on the kind of call being made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("No responders configured")]
    NoResponders,

    #[error("Primary index {index} is out of range for {len} responders")]
    PrimaryIndexOutOfRange { index: usize, len: usize },

    #[error("Similarity threshold {0} must be within (0, 1]")]
    InvalidThreshold(f64),

    #[error("Responder '{name}' has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Consensus strategy is disabled for streaming calls")]
    StreamingConsensusDisabled,

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown consensus method: {0}")]
    UnknownConsensusMethod(String),

    #[error("Unknown streaming consensus mode: {0}")]
    UnknownStreamingConsensus(String),
}

/// Errors raised by the consensus selectors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusError {
    /// Every responder failed, so there is nothing to vote on.
    #[error("No consensus possible: candidate pool is empty")]
    EmptyCandidatePool,

    /// Candidates exist but every group carries zero total weight.
    #[error("No consensus possible: every candidate group has zero weight")]
    NoWeightedGroup,
}
