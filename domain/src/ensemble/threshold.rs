//! Similarity threshold value object

use crate::core::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Minimum pairwise similarity for two answers to share a group.
///
/// Always within `(0, 1]`. Construct with [`SimilarityThreshold::new`], which
/// rejects anything outside that range (including NaN).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimilarityThreshold(f64);

impl SimilarityThreshold {
    /// Threshold used when none is configured.
    pub const DEFAULT: SimilarityThreshold = SimilarityThreshold(0.7);

    /// Fixed threshold used by the majority selector.
    pub const MAJORITY: SimilarityThreshold = SimilarityThreshold(0.5);

    pub fn new(value: f64) -> Result<Self, ConfigurationError> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(ConfigurationError::InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether a similarity score is high enough to merge two answers
    pub fn admits(&self, score: f64) -> bool {
        score >= self.0
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for SimilarityThreshold {
    type Error = ConfigurationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SimilarityThreshold> for f64 {
    fn from(threshold: SimilarityThreshold) -> Self {
        threshold.0
    }
}

impl std::fmt::Display for SimilarityThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_range() {
        assert!(SimilarityThreshold::new(1.0).is_ok());
        assert!(SimilarityThreshold::new(0.01).is_ok());
        assert_eq!(
            SimilarityThreshold::new(0.0),
            Err(ConfigurationError::InvalidThreshold(0.0))
        );
        assert!(SimilarityThreshold::new(1.2).is_err());
        assert!(SimilarityThreshold::new(f64::NAN).is_err());
    }

    #[test]
    fn test_admits_is_inclusive() {
        let threshold = SimilarityThreshold::new(0.6).unwrap();
        assert!(threshold.admits(0.6));
        assert!(threshold.admits(0.9));
        assert!(!threshold.admits(0.59));
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let ok: SimilarityThreshold = serde_json::from_str("0.8").unwrap();
        assert_eq!(ok.value(), 0.8);
        assert!(serde_json::from_str::<SimilarityThreshold>("0").is_err());
    }
}
