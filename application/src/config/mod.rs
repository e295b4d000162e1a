//! Application-level configuration.
//!
//! - [`ProviderWeight`]: one responder with its display name and voting weight
//! - [`OrchestratorConfig`]: the ordered responder list plus ensemble settings

pub mod orchestrator_config;
pub mod provider;

pub use orchestrator_config::OrchestratorConfig;
pub use provider::ProviderWeight;
