//! Per-responder results collected during one ensemble call.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of invoking one responder once (Value Object)
///
/// Produced by the dispatcher for every invocation, successful or not.
/// Failed results never enter the consensus candidate pool, but they are
/// kept so callers can see why a responder did not contribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedResult {
    /// Display name of the responder
    pub responder: String,
    /// Position of the responder in the configured list
    pub index: usize,
    /// Produced content (empty on failure)
    pub content: String,
    /// Wall time spent on this invocation
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    pub elapsed: Duration,
    /// Voting weight of the responder
    pub weight: f64,
    /// Error message if the invocation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectedResult {
    /// Creates a successful result.
    pub fn success(
        responder: impl Into<String>,
        index: usize,
        content: impl Into<String>,
        elapsed: Duration,
        weight: f64,
    ) -> Self {
        Self {
            responder: responder.into(),
            index,
            content: content.into(),
            elapsed,
            weight,
            error: None,
        }
    }

    /// Creates a failed result carrying the responder's error message.
    pub fn failure(
        responder: impl Into<String>,
        index: usize,
        error: impl Into<String>,
        elapsed: Duration,
        weight: f64,
    ) -> Self {
        Self {
            responder: responder.into(),
            index,
            content: String::new(),
            elapsed,
            weight,
            error: Some(error.into()),
        }
    }

    /// Returns `true` if the responder produced content.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Successful results only, preserving order.
pub fn candidates(results: &[CollectedResult]) -> Vec<CollectedResult> {
    results.iter().filter(|r| r.is_success()).cloned().collect()
}

/// Serde adapter storing a [`Duration`] as whole milliseconds.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
