//! Domain layer for ensemble-quorum
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns, and no
//! async runtime.
//!
//! # Core Concepts
//!
//! ## Ensemble
//!
//! An ensemble is an ordered set of redundant responders asked the same
//! question. The [`Strategy`] decides how they are dispatched:
//!
//! - **Fastest**: first success wins
//! - **Primary** (default): the primary responder, falling back in order
//! - **Consensus**: everyone answers, then a [`ConsensusMethod`] votes
//!
//! ## Consensus
//!
//! Answers are grouped by pairwise similarity (see [`consensus`]) and the
//! winning group is chosen by member count or by summed weight. Ties are
//! broken by latency and then by configured order, so the result does not
//! depend on which responder happened to finish first.

pub mod config;
pub mod consensus;
pub mod core;
pub mod ensemble;
pub mod session;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use consensus::{
    CacheObserver, ConsensusDecision, GroupSummary, NoopObserver, SimilarityCache,
    calculate_similarity, reset_similarity_cache,
};
pub use core::error::{ConfigurationError, ConsensusError};
pub use ensemble::{
    result::CollectedResult,
    settings::EnsembleSettings,
    strategy::{ConsensusMethod, Strategy, StreamingConsensus},
    threshold::SimilarityThreshold,
};
pub use session::{
    entities::{Message, Role},
    stream::StreamEvent,
};
