//! Canned responder

use async_trait::async_trait;
use ensemble_application::{CallContext, GenerateOptions, Responder, ResponderError};
use std::time::Duration;

/// Responder that answers with configured text, or fails with a configured
/// message, after an optional delay.
#[derive(Debug, Clone)]
pub struct FixedResponder {
    reply: Result<String, String>,
    delay: Duration,
}

impl FixedResponder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: Duration::ZERO,
        }
    }

    /// A responder that always fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Responder for FixedResponder {
    async fn generate(
        &self,
        ctx: &CallContext,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        ctx.run(tokio::time::sleep(self.delay)).await?;
        self.reply.clone().map_err(ResponderError::RequestFailed)
    }

    async fn generate_structured(
        &self,
        ctx: &CallContext,
        prompt: &str,
        _schema: &serde_json::Value,
        options: &GenerateOptions,
    ) -> Result<serde_json::Value, ResponderError> {
        let text = self.generate(ctx, prompt, options).await?;
        serde_json::from_str(&text).map_err(|e| ResponderError::InvalidOutput(e.to_string()))
    }
}
