//! Orchestrator facade
//!
//! Bundles a validated [`OrchestratorConfig`], a similarity cache and a
//! progress observer behind the [`Responder`] interface, so an ensemble can
//! be used anywhere a single responder is expected (including inside another
//! ensemble).
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(providers, Strategy::Consensus)?
//!     .with_consensus_method(ConsensusMethod::Weighted)
//!     .with_similarity_threshold(0.8)?;
//!
//! let outcome = orchestrator
//!     .dispatch(&CallContext::with_timeout(timeout), "Capital of France?", &GenerateOptions::default())
//!     .await?;
//! println!("{} {}", outcome.content(), outcome.decision.unwrap().vote_summary());
//! ```

use super::racer::{EnsembleError, EnsembleOutcome, Racer, Request};
use crate::config::{OrchestratorConfig, ProviderWeight};
use crate::ports::call_context::CallContext;
use crate::ports::progress::{DispatchObserver, NoObserver};
use crate::ports::responder::{GenerateOptions, Responder, ResponderError, StreamHandle};
use async_trait::async_trait;
use ensemble_domain::{
    ConfigurationError, ConsensusMethod, EnsembleSettings, Message, SimilarityCache,
    SimilarityThreshold, Strategy, StreamingConsensus,
};
use std::sync::Arc;
use std::time::Duration;

/// An immutable, validated ensemble of responders
///
/// Every `with_*` method consumes the orchestrator and returns a new value;
/// an existing orchestrator never changes behavior. Cloning is cheap (the
/// responders, cache and observer are shared).
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    cache: Arc<SimilarityCache>,
    observer: Arc<dyn DispatchObserver>,
}

impl Orchestrator {
    /// Create an orchestrator with default settings for `strategy`.
    pub fn new(
        providers: Vec<ProviderWeight>,
        strategy: Strategy,
    ) -> Result<Self, ConfigurationError> {
        Self::from_config(OrchestratorConfig::new(
            providers,
            EnsembleSettings::new(strategy),
        ))
    }

    /// Create an orchestrator from a complete configuration.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: Arc::clone(SimilarityCache::global()),
            observer: Arc::new(NoObserver),
        })
    }

    // ==================== Fluent setters ====================

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.settings.strategy = strategy;
        self
    }

    pub fn with_primary_index(mut self, index: usize) -> Result<Self, ConfigurationError> {
        self.config.settings.primary_index = index;
        self.config.validate()?;
        Ok(self)
    }

    pub fn with_consensus_method(mut self, method: ConsensusMethod) -> Self {
        self.config.settings.consensus_method = method;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Result<Self, ConfigurationError> {
        self.config.settings.similarity_threshold = SimilarityThreshold::new(threshold)?;
        Ok(self)
    }

    pub fn with_streaming_consensus(mut self, mode: StreamingConsensus) -> Self {
        self.config.settings.streaming_consensus = mode;
        self
    }

    /// Bound every individual responder invocation.
    pub fn with_responder_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.settings.responder_timeout = timeout;
        self
    }

    /// Use a dedicated similarity cache instead of the process-wide one.
    pub fn with_cache(mut self, cache: Arc<SimilarityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn settings(&self) -> &EnsembleSettings {
        &self.config.settings
    }

    pub fn strategy(&self) -> Strategy {
        self.config.settings.strategy
    }

    pub fn cache(&self) -> &Arc<SimilarityCache> {
        &self.cache
    }

    // ==================== Dispatch ====================

    /// Answer a prompt and return the full diagnostic outcome.
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        self.racer()
            .run(ctx, Request::Prompt(prompt.to_string()), options.clone())
            .await
    }

    /// Answer a conversation and return the full diagnostic outcome.
    pub async fn dispatch_messages(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        self.racer()
            .run(ctx, Request::Messages(messages.to_vec()), options.clone())
            .await
    }

    /// Produce a structured value.
    ///
    /// Under consensus, values are compared by their canonical JSON text, so
    /// objects that differ only in key order agree.
    pub async fn dispatch_structured(
        &self,
        ctx: &CallContext,
        prompt: &str,
        schema: &serde_json::Value,
        options: &GenerateOptions,
    ) -> Result<(serde_json::Value, EnsembleOutcome), EnsembleError> {
        let request = Request::Structured {
            prompt: prompt.to_string(),
            schema: schema.clone(),
        };
        let outcome = self.racer().run(ctx, request, options.clone()).await?;
        let value = serde_json::from_str(outcome.content())
            .map_err(|e| EnsembleError::InvalidStructuredOutput(e.to_string()))?;
        Ok((value, outcome))
    }

    /// Answer a prompt as a stream.
    pub async fn dispatch_stream(
        &self,
        ctx: &CallContext,
        request: Request,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, EnsembleError> {
        self.racer()
            .run_stream(ctx, request, options.clone())
            .await
    }

    fn racer(&self) -> Racer<'_> {
        Racer::new(&self.config, &self.cache, self.observer.as_ref())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Responder for Orchestrator {
    async fn generate(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        let outcome = self.dispatch(ctx, prompt, options).await?;
        Ok(outcome.winner.content)
    }

    async fn generate_messages(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<String, ResponderError> {
        let outcome = self.dispatch_messages(ctx, messages, options).await?;
        Ok(outcome.winner.content)
    }

    async fn generate_structured(
        &self,
        ctx: &CallContext,
        prompt: &str,
        schema: &serde_json::Value,
        options: &GenerateOptions,
    ) -> Result<serde_json::Value, ResponderError> {
        let (value, _) = self
            .dispatch_structured(ctx, prompt, schema, options)
            .await?;
        Ok(value)
    }

    async fn stream(
        &self,
        ctx: &CallContext,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        Ok(self
            .dispatch_stream(ctx, Request::Prompt(prompt.to_string()), options)
            .await?)
    }

    async fn stream_messages(
        &self,
        ctx: &CallContext,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<StreamHandle, ResponderError> {
        Ok(self
            .dispatch_stream(ctx, Request::Messages(messages.to_vec()), options)
            .await?)
    }
}
