//! Responder port
//!
//! Defines the interface every backend answering a prompt implements.
//! Adapters live in the infrastructure layer; the
//! [`Orchestrator`](crate::use_cases::orchestrator::Orchestrator) implements
//! it too, so ensembles nest.

use super::call_context::{CallContext, ContextError};
use crate::use_cases::racer::EnsembleError;
use async_trait::async_trait;
use ensemble_domain::{Message, StreamEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a single responder invocation can produce
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("Process error: {0}")]
    Process(String),

    /// A nested ensemble failed; the inner error is kept intact.
    #[error(transparent)]
    Ensemble(Box<EnsembleError>),
}

impl ResponderError {
    /// Check if this error was caused by the call context ending
    pub fn is_context_error(&self) -> bool {
        matches!(self, ResponderError::Timeout | ResponderError::Cancelled)
    }
}

impl From<ContextError> for ResponderError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Cancelled => ResponderError::Cancelled,
            ContextError::DeadlineExceeded => ResponderError::Timeout,
        }
    }
}

impl From<EnsembleError> for ResponderError {
    fn from(error: EnsembleError) -> Self {
        ResponderError::Ensemble(Box::new(error))
    }
}

/// Generation options passed through to responders unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl GenerateOptions {
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Handle for receiving streaming events from a responder.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
#[derive(Debug)]
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// A stream consisting of a single `Completed` event.
    pub fn from_text(text: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: this cannot fail
        let _ = tx.try_send(StreamEvent::Completed(text.into()));
        Self::new(rx)
    }

    /// Receive the next event (`None` once the sender side is gone).
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, ResponderError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    if full_text.is_empty() {
                        return Ok(text);
                    }
                    return Ok(full_text);
                }
                StreamEvent::Error(e) => {
                    return Err(ResponderError::RequestFailed(e));
                }
            }
        }
        // Channel closed without Completed: return what we have
        Ok(full_text)
    }
}

/// Anything that can answer a prompt
///
/// Only [`generate`](Responder::generate) is required. The message, structured
/// and streaming variants have defaults built on top of it.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce content for a prompt
    async fn generate(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ResponderError>;

    /// Produce content for a conversation.
    ///
    /// Default implementation renders the messages as a transcript and calls
    /// `generate()`.
    async fn generate_messages(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        self.generate(ctx, &Message::transcript(messages), options)
            .await
    }

    /// Produce a JSON value conforming to `schema`.
    async fn generate_structured(
        &self,
        _ctx: &CallContext,
        _prompt: &str,
        _schema: &serde_json::Value,
        _options: &GenerateOptions,
    ) -> Result<serde_json::Value, ResponderError> {
        Err(ResponderError::Unsupported(
            "structured output".to_string(),
        ))
    }

    /// Produce content as a stream of events.
    ///
    /// Default implementation calls `generate()` and wraps the result in a
    /// single `Completed` event.
    async fn stream(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        let text = self.generate(ctx, prompt, options).await?;
        Ok(StreamHandle::from_text(text))
    }

    /// Streaming variant of [`generate_messages`](Responder::generate_messages).
    async fn stream_messages(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        let text = self.generate_messages(ctx, messages, options).await?;
        Ok(StreamHandle::from_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoResponder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Responder for EchoResponder {
        async fn generate(
            &self,
            _ctx: &CallContext,
            prompt: &str,
            _options: &GenerateOptions,
        ) -> Result<String, ResponderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("echo: {}", prompt))
        }
    }

    fn echo() -> EchoResponder {
        EchoResponder {
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_default_generate_messages_uses_transcript() {
        let responder = echo();
        let messages = vec![Message::system("Be brief."), Message::user("Capital of France?")];
        let answer = responder
            .generate_messages(&CallContext::new(), &messages, &GenerateOptions::default())
            .await
            .unwrap();

        let expected = Message::transcript(&messages);
        assert_eq!(answer, format!("echo: {}", expected));
        assert_eq!(responder.prompts.lock().unwrap().as_slice(), &[expected]);
    }

    #[tokio::test]
    async fn test_default_structured_is_unsupported() {
        let result = echo()
            .generate_structured(
                &CallContext::new(),
                "x",
                &serde_json::json!({}),
                &GenerateOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(ResponderError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_default_stream_wraps_generate() {
        let mut handle = echo()
            .stream(&CallContext::new(), "hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(
            handle.next().await,
            Some(StreamEvent::Completed("echo: hi".to_string()))
        );
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn test_collect_text_joins_deltas() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::Delta("Par".to_string())).await.unwrap();
        tx.send(StreamEvent::Delta("is".to_string())).await.unwrap();
        tx.send(StreamEvent::Completed("Paris".to_string()))
            .await
            .unwrap();
        drop(tx);
        assert_eq!(StreamHandle::new(rx).collect_text().await.unwrap(), "Paris");

        let (tx, rx) = mpsc::channel(2);
        tx.send(StreamEvent::Delta("partial".to_string()))
            .await
            .unwrap();
        tx.send(StreamEvent::Error("backend closed".to_string()))
            .await
            .unwrap();
        drop(tx);
        assert!(matches!(
            StreamHandle::new(rx).collect_text().await,
            Err(ResponderError::RequestFailed(msg)) if msg == "backend closed"
        ));
    }

    #[test]
    fn test_context_error_mapping() {
        assert!(matches!(
            ResponderError::from(ContextError::DeadlineExceeded),
            ResponderError::Timeout
        ));
        assert!(ResponderError::from(ContextError::Cancelled).is_context_error());
    }
}
