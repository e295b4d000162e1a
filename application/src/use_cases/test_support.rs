//! Scripted responders shared by the use case tests.

use crate::config::ProviderWeight;
use crate::ports::call_context::CallContext;
use crate::ports::responder::{GenerateOptions, Responder, ResponderError, StreamHandle};
use async_trait::async_trait;
use ensemble_domain::StreamEvent;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

enum Step {
    Answer(String),
    Fail(String),
    Hang,
    Panic(String),
    /// Streamed as one Delta per chunk, each after `delay`
    Chunks(Vec<String>),
}

/// Responder that answers after a fixed delay
pub(crate) struct Scripted {
    delay: Duration,
    step: Step,
    calls: AtomicUsize,
    finished: AtomicBool,
    context: Mutex<Option<CallContext>>,
}

impl Scripted {
    fn new(step: Step, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::from_millis(delay_ms),
            step,
            calls: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            context: Mutex::new(None),
        })
    }

    pub(crate) fn answer(text: &str, delay_ms: u64) -> Arc<Self> {
        Self::new(Step::Answer(text.to_string()), delay_ms)
    }

    pub(crate) fn failure(message: &str, delay_ms: u64) -> Arc<Self> {
        Self::new(Step::Fail(message.to_string()), delay_ms)
    }

    pub(crate) fn hang() -> Arc<Self> {
        Self::new(Step::Hang, 0)
    }

    pub(crate) fn panics(message: &str, delay_ms: u64) -> Arc<Self> {
        Self::new(Step::Panic(message.to_string()), delay_ms)
    }

    pub(crate) fn chunks(chunks: &[&str], delay_ms: u64) -> Arc<Self> {
        Self::new(
            Step::Chunks(chunks.iter().map(|c| c.to_string()).collect()),
            delay_ms,
        )
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The context handed to the most recent call
    pub(crate) fn last_context(&self) -> Option<CallContext> {
        self.context.lock().unwrap().clone()
    }

    /// Whether a call ran to completion instead of being cancelled
    pub(crate) fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Responder for Scripted {
    async fn generate(
        &self,
        ctx: &CallContext,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.context.lock().unwrap() = Some(ctx.clone());
        tokio::select! {
            _ = ctx.token().cancelled() => return Err(ResponderError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }
        let result = match &self.step {
            Step::Answer(text) => Ok(text.clone()),
            Step::Fail(message) => Err(ResponderError::RequestFailed(message.clone())),
            Step::Hang => std::future::pending().await,
            Step::Panic(message) => panic!("{}", message),
            Step::Chunks(chunks) => Ok(chunks.concat()),
        };
        self.finished.store(true, Ordering::SeqCst);
        result
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

    async fn stream(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        let Step::Chunks(chunks) = &self.step else {
            let text = self.generate(ctx, prompt, options).await?;
            return Ok(StreamHandle::from_text(text));
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunks = chunks.clone();
        let delay = self.delay;
        let (tx, rx) = mpsc::channel(chunks.len() + 1);
        tokio::spawn(async move {
            for chunk in &chunks {
                tokio::time::sleep(delay).await;
                if tx.send(StreamEvent::Delta(chunk.clone())).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(StreamEvent::Completed(chunks.concat())).await;
        });
        Ok(StreamHandle::new(rx))
    }
}

pub(crate) fn provider(name: &str, responder: &Arc<Scripted>) -> ProviderWeight {
    ProviderWeight::new(name, Arc::clone(responder) as Arc<dyn Responder>)
}
