//! Weighted responder entry.

use crate::ports::responder::Responder;
use ensemble_domain::ConfigurationError;
use std::sync::Arc;

/// A responder together with its name and voting weight.
///
/// The weight only matters for weighted consensus. A weight of `0.0` keeps the
/// responder in the pool (it still counts for majority grouping) but its
/// answers can never win a weighted vote on their own.
#[derive(Clone)]
pub struct ProviderWeight {
    pub name: String,
    pub responder: Arc<dyn Responder>,
    pub weight: f64,
}

impl ProviderWeight {
    /// Create an entry with weight `1.0`.
    pub fn new(name: impl Into<String>, responder: Arc<dyn Responder>) -> Self {
        Self {
            name: name.into(),
            responder,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Weights must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.weight.is_finite() && self.weight >= 0.0 {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidWeight {
                name: self.name.clone(),
                weight: self.weight,
            })
        }
    }
}

impl std::fmt::Debug for ProviderWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderWeight")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}
