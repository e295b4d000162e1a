//! Request, outcome and error types of the racer.

use crate::ports::call_context::{CallContext, ContextError};
use crate::ports::responder::{GenerateOptions, Responder, ResponderError, StreamHandle};
use ensemble_domain::ensemble::result::duration_millis;
use ensemble_domain::{
    CollectedResult, ConfigurationError, ConsensusDecision, ConsensusError, ConsensusMethod,
    Message, Strategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that end an ensemble call
///
/// Individual responder failures are not errors of the call: they are
/// recorded on their [`CollectedResult`]. Only configuration problems,
/// exhaustion of every responder, a failed vote and the caller's context
/// ending are fatal.
#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("All {} responders failed", .failures.len())]
    EmptyCandidatePool { failures: Vec<CollectedResult> },

    #[error("Responder '{responder}' failed: {source}")]
    Responder {
        responder: String,
        source: ResponderError,
    },

    #[error("Consensus failed: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Invalid structured output: {0}")]
    InvalidStructuredOutput(String),
}

impl EnsembleError {
    /// Check if the caller's context ended the call
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            EnsembleError::DeadlineExceeded | EnsembleError::Cancelled
        )
    }
}

impl From<ContextError> for EnsembleError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Cancelled => EnsembleError::Cancelled,
            ContextError::DeadlineExceeded => EnsembleError::DeadlineExceeded,
        }
    }
}

/// What is being asked of every responder
#[derive(Debug, Clone)]
pub enum Request {
    Prompt(String),
    Messages(Vec<Message>),
    /// Structured output; each value is compared by its canonical JSON text
    Structured {
        prompt: String,
        schema: serde_json::Value,
    },
}

impl Request {
    /// Invoke one responder and return its content as text.
    pub(crate) async fn generate(
        &self,
        responder: &dyn Responder,
        ctx: &CallContext,
        options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        match self {
            Request::Prompt(prompt) => responder.generate(ctx, prompt, options).await,
            Request::Messages(messages) => {
                responder.generate_messages(ctx, messages, options).await
            }
            Request::Structured { prompt, schema } => {
                let value = responder
                    .generate_structured(ctx, prompt, schema, options)
                    .await?;
                serde_json::to_string(&value)
                    .map_err(|e| ResponderError::InvalidOutput(e.to_string()))
            }
        }
    }

    /// Open a stream on one responder.
    pub(crate) async fn stream(
        &self,
        responder: &dyn Responder,
        ctx: &CallContext,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        match self {
            Request::Prompt(prompt) => responder.stream(ctx, prompt, options).await,
            Request::Messages(messages) => {
                responder.stream_messages(ctx, messages, options).await
            }
            Request::Structured { .. } => Err(ResponderError::Unsupported(
                "streaming structured output".to_string(),
            )),
        }
    }
}

/// Diagnostic view of one resolved ensemble call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleOutcome {
    pub strategy: Strategy,
    /// Consensus method, only set for [`Strategy::Consensus`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ConsensusMethod>,
    /// The result whose content is returned to the caller
    pub winner: CollectedResult,
    /// Every result that finished, in configured order
    pub results: Vec<CollectedResult>,
    /// Vote breakdown, only set for [`Strategy::Consensus`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<ConsensusDecision>,
    /// Wall time of the whole call
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    pub elapsed: Duration,
}

impl EnsembleOutcome {
    /// Content of the winning result
    pub fn content(&self) -> &str {
        &self.winner.content
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectedResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}
