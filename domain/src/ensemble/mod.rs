//! Ensemble configuration and result value objects.
//!
//! - [`strategy::Strategy`]: how a call is dispatched (fastest / primary / consensus)
//! - [`strategy::ConsensusMethod`]: how the consensus strategy votes
//! - [`threshold::SimilarityThreshold`]: validated clustering threshold
//! - [`settings::EnsembleSettings`]: immutable per-orchestrator settings
//! - [`result::CollectedResult`]: one responder invocation's outcome

pub mod result;
pub mod settings;
pub mod strategy;
pub mod threshold;
