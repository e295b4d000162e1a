//! Streaming dispatch
//!
//! - `Fastest` forwards the first stream that produces a token
//! - `Primary` forwards the primary's stream, falling back only when a
//!   responder fails before its first token
//! - `Consensus` either materializes every stream and emits the winner as one
//!   `Completed` event, or is rejected, depending on [`StreamingConsensus`]

use super::{EnsembleError, Racer, Request, TaskIndex, release, settle};
use crate::ports::call_context::CallContext;
use crate::ports::responder::{GenerateOptions, Responder, ResponderError, StreamHandle};
use ensemble_domain::{ConfigurationError, StreamEvent, Strategy, StreamingConsensus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Events buffered between a winning stream and the caller
const FORWARD_BUFFER: usize = 32;

type FirstToken = (
    usize,
    Duration,
    Result<(StreamEvent, StreamHandle), ResponderError>,
);

impl Racer<'_> {
    /// Dispatch `request` and return the winning stream.
    pub async fn run_stream(
        &self,
        ctx: &CallContext,
        request: Request,
        options: GenerateOptions,
    ) -> Result<StreamHandle, EnsembleError> {
        self.config.validate()?;
        ctx.check()?;

        let strategy = self.config.settings.strategy;
        if strategy.waits_for_all() {
            return match self.config.settings.streaming_consensus {
                StreamingConsensus::Disallow => {
                    Err(ConfigurationError::StreamingConsensusDisabled.into())
                }
                StreamingConsensus::Materialize => {
                    debug!("Materializing every stream before voting");
                    let racer = Racer {
                        streamed: true,
                        ..*self
                    };
                    let outcome = racer.run(ctx, request, options).await?;
                    Ok(StreamHandle::from_text(outcome.winner.content))
                }
            };
        }

        info!(
            strategy = %strategy,
            responders = self.config.len(),
            "Dispatching streaming ensemble call"
        );
        self.observer
            .on_dispatch_start(strategy, self.config.len());

        let request = Arc::new(request);
        let options = Arc::new(options);
        match strategy {
            Strategy::Fastest => self.stream_fastest(ctx, &request, &options).await,
            _ => self.stream_primary(ctx, &request, &options).await,
        }
    }

    async fn stream_fastest(
        &self,
        ctx: &CallContext,
        request: &Arc<Request>,
        options: &Arc<GenerateOptions>,
    ) -> Result<StreamHandle, EnsembleError> {
        let mut join_set: JoinSet<FirstToken> = JoinSet::new();
        let mut children = Vec::with_capacity(self.config.len());
        let mut tasks = TaskIndex::with_capacity(self.config.len());
        let started = Instant::now();

        for (index, provider) in self.config.providers.iter().enumerate() {
            let child = ctx.child_with_timeout(self.config.settings.responder_timeout);
            let task_ctx = child.clone();
            let responder = Arc::clone(&provider.responder);
            let request = Arc::clone(request);
            let options = Arc::clone(options);

            let handle = join_set.spawn(async move {
                let start = Instant::now();
                let result = first_token(responder.as_ref(), &task_ctx, &request, &options).await;
                (index, start.elapsed(), result)
            });
            tasks.insert(handle.id(), index);
            children.push(child);
        }

        let mut failures = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                reason = ctx.done() => {
                    warn!(reason = %reason, "Context ended before any stream produced a token");
                    release(&mut join_set, &children, None);
                    return Err(reason.into());
                }
                joined = join_set.join_next() => joined,
            };
            let Some(joined) = joined else { break };

            let Some((index, elapsed, result)) = settle(joined, &tasks, started) else {
                continue;
            };

            match result {
                Ok((first, handle)) => {
                    // The answer is still arriving, so observers get no content
                    self.record_success(index, elapsed, String::new());
                    release(&mut join_set, &children, Some(index));
                    return Ok(forward(first, handle, children[index].clone()));
                }
                Err(error) => failures.push(self.record_failure(index, elapsed, &error)),
            }
        }

        failures.sort_by_key(|r| r.index);
        Err(EnsembleError::EmptyCandidatePool { failures })
    }

    async fn stream_primary(
        &self,
        ctx: &CallContext,
        request: &Request,
        options: &GenerateOptions,
    ) -> Result<StreamHandle, EnsembleError> {
        let settings = &self.config.settings;
        let mut last_failure: Option<(String, ResponderError)> = None;

        for index in settings.primary_order(self.config.len()) {
            ctx.check()?;

            let provider = &self.config.providers[index];
            let child = ctx.child_with_timeout(settings.responder_timeout);
            let start = Instant::now();

            match first_token(provider.responder.as_ref(), &child, request, options).await {
                Ok((first, handle)) => {
                    self.record_success(index, start.elapsed(), String::new());
                    return Ok(forward(first, handle, child));
                }
                Err(error) => {
                    self.record_failure(index, start.elapsed(), &error);
                    last_failure = Some((provider.name.clone(), error));
                }
            }
        }

        ctx.check()?;
        let (responder, source) = last_failure.ok_or(ConfigurationError::NoResponders)?;
        Err(EnsembleError::Responder { responder, source })
    }
}

/// Open a stream and wait for its first token, bounded by `ctx`.
async fn first_token(
    responder: &dyn Responder,
    ctx: &CallContext,
    request: &Request,
    options: &GenerateOptions,
) -> Result<(StreamEvent, StreamHandle), ResponderError> {
    match ctx.run(open_stream(responder, ctx, request, options)).await {
        Ok(result) => result,
        Err(reason) => Err(reason.into()),
    }
}

async fn open_stream(
    responder: &dyn Responder,
    ctx: &CallContext,
    request: &Request,
    options: &GenerateOptions,
) -> Result<(StreamEvent, StreamHandle), ResponderError> {
    let mut handle = request.stream(responder, ctx, options).await?;
    match handle.next().await {
        Some(event) if event.is_token() => Ok((event, handle)),
        Some(StreamEvent::Error(e)) => Err(ResponderError::RequestFailed(e)),
        _ => Err(ResponderError::RequestFailed(
            "stream closed before the first token".to_string(),
        )),
    }
}

/// Pipe the rest of a winning stream to the caller.
///
/// The stream ends with an `Error` event if `ctx` ends first.
fn forward(first: StreamEvent, mut source: StreamHandle, ctx: CallContext) -> StreamHandle {
    let (tx, rx) = mpsc::channel(FORWARD_BUFFER);
    tokio::spawn(async move {
        let mut event = first;
        loop {
            let terminal = event.is_terminal();
            if tx.send(event).await.is_err() || terminal {
                return;
            }
            event = tokio::select! {
                biased;
                reason = ctx.done() => StreamEvent::Error(reason.to_string()),
                next = source.next() => match next {
                    Some(next) => next,
                    None => return,
                },
            };
        }
    });
    StreamHandle::new(rx)
}
