//! Orchestrator configuration.

use super::provider::ProviderWeight;
use ensemble_domain::{ConfigurationError, EnsembleSettings};

/// Ordered responders plus the settings that drive dispatch and voting.
///
/// The position of a responder in `providers` is its configured index: it
/// decides the Primary fallback order and breaks the last tie in every vote.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub providers: Vec<ProviderWeight>,
    pub settings: EnsembleSettings,
}

impl OrchestratorConfig {
    pub fn new(providers: Vec<ProviderWeight>, settings: EnsembleSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    /// Check every invariant that can be checked without calling anyone.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.settings.validate(self.providers.len())?;
        for provider in &self.providers {
            provider.validate()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
