//! Racer use case
//!
//! Dispatches one request to the configured responders and resolves a single
//! result according to the configured [`Strategy`]:
//!
//! | Strategy | Invocation | Resolution |
//! |----------|------------|------------|
//! | `Fastest` | all concurrently | first success; losers are cancelled and detached |
//! | `Primary` | one at a time, primary first, wrapping around | first success |
//! | `Consensus` | all concurrently | vote over every success |
//!
//! Individual failures never abort siblings: they are recorded on their
//! [`CollectedResult`] and the call continues. A responder task that panics is
//! recorded the same way. Unfinished tasks are cancelled through their context
//! and detached, never aborted. Results are always reported in
//! configured order, so voting never depends on completion order.

mod streaming;
mod types;

pub use types::{EnsembleError, EnsembleOutcome, Request};

use crate::config::OrchestratorConfig;
use crate::ports::call_context::CallContext;
use crate::ports::progress::DispatchObserver;
use crate::ports::responder::{GenerateOptions, Responder, ResponderError};
use ensemble_domain::consensus::select;
use ensemble_domain::core::string::preview;
use ensemble_domain::ensemble::result::candidates;
use ensemble_domain::{CollectedResult, ConfigurationError, SimilarityCache, Strategy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type Invocation = (usize, Duration, Result<String, ResponderError>);

/// Configured index of each spawned responder task
type TaskIndex = HashMap<task::Id, usize>;

/// Dispatcher for a single ensemble call
#[derive(Clone, Copy)]
pub struct Racer<'a> {
    config: &'a OrchestratorConfig,
    cache: &'a SimilarityCache,
    observer: &'a dyn DispatchObserver,
    /// Invoke responders through their streaming entry point and collect the text
    streamed: bool,
}

impl<'a> Racer<'a> {
    pub fn new(
        config: &'a OrchestratorConfig,
        cache: &'a SimilarityCache,
        observer: &'a dyn DispatchObserver,
    ) -> Self {
        Self {
            config,
            cache,
            observer,
            streamed: false,
        }
    }

    /// Dispatch `request` and resolve one winner.
    pub async fn run(
        &self,
        ctx: &CallContext,
        request: Request,
        options: GenerateOptions,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        self.config.validate()?;
        ctx.check()?;

        let strategy = self.config.settings.strategy;
        info!(
            strategy = %strategy,
            responders = self.config.len(),
            remaining_ms = ctx.remaining().map(|d| d.as_millis() as u64),
            "Dispatching ensemble call"
        );
        self.observer
            .on_dispatch_start(strategy, self.config.len());

        let request = Arc::new(request);
        let options = Arc::new(options);
        let started = Instant::now();

        let outcome = match strategy {
            Strategy::Fastest => self.run_fastest(ctx, &request, &options, started).await,
            Strategy::Primary => self.run_primary(ctx, &request, &options, started).await,
            Strategy::Consensus => {
                self.run_consensus(ctx, &request, &options, started)
                    .await
            }
        }?;

        info!(
            winner = %outcome.winner.responder,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Ensemble call resolved"
        );
        self.observer.on_decision(&outcome);
        Ok(outcome)
    }

    /// Fastest: first success wins.
    async fn run_fastest(
        &self,
        ctx: &CallContext,
        request: &Arc<Request>,
        options: &Arc<GenerateOptions>,
        started: Instant,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        let mut join_set = JoinSet::new();
        let (children, tasks) = self.spawn_all(&mut join_set, ctx, request, options);
        let mut results = Vec::new();

        loop {
            let joined = tokio::select! {
                biased;
                reason = ctx.done() => {
                    warn!(reason = %reason, "Context ended before any responder succeeded");
                    release(&mut join_set, &children, None);
                    return Err(reason.into());
                }
                joined = join_set.join_next() => joined,
            };
            let Some(joined) = joined else { break };

            let Some((index, elapsed, result)) = settle(joined, &tasks, started) else {
                continue;
            };

            let (collected, _) = self.record(index, elapsed, result);
            if collected.is_success() {
                release(&mut join_set, &children, Some(index));

                results.push(collected.clone());
                results.sort_by_key(|r| r.index);
                return Ok(EnsembleOutcome {
                    strategy: Strategy::Fastest,
                    method: None,
                    winner: collected,
                    results,
                    decision: None,
                    elapsed: started.elapsed(),
                });
            }
            results.push(collected);
        }

        results.sort_by_key(|r| r.index);
        Err(EnsembleError::EmptyCandidatePool { failures: results })
    }

    /// Primary: sequential fallback in wrap-around order.
    async fn run_primary(
        &self,
        ctx: &CallContext,
        request: &Request,
        options: &GenerateOptions,
        started: Instant,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        let settings = &self.config.settings;
        let mut results = Vec::new();
        let mut last_failure: Option<(String, ResponderError)> = None;

        for index in settings.primary_order(self.config.len()) {
            ctx.check()?;

            let provider = &self.config.providers[index];
            if let Some((failed, _)) = &last_failure {
                info!(from = %failed, to = %provider.name, "Falling back");
            }

            let child = ctx.child_with_timeout(settings.responder_timeout);
            let (elapsed, result) = invoke(
                provider.responder.as_ref(),
                &child,
                request,
                options,
                self.streamed,
            )
            .await;
            let (collected, error) = self.record(index, elapsed, result);
            results.push(collected.clone());

            match error {
                None => {
                    results.sort_by_key(|r| r.index);
                    return Ok(EnsembleOutcome {
                        strategy: Strategy::Primary,
                        method: None,
                        winner: collected,
                        results,
                        decision: None,
                        elapsed: started.elapsed(),
                    });
                }
                Some(error) => last_failure = Some((provider.name.clone(), error)),
            }
        }

        ctx.check()?;
        let (responder, source) = last_failure.ok_or(ConfigurationError::NoResponders)?;
        Err(EnsembleError::Responder { responder, source })
    }

    /// Consensus: gather everything, then vote.
    async fn run_consensus(
        &self,
        ctx: &CallContext,
        request: &Arc<Request>,
        options: &Arc<GenerateOptions>,
        started: Instant,
    ) -> Result<EnsembleOutcome, EnsembleError> {
        let mut join_set = JoinSet::new();
        let (children, tasks) = self.spawn_all(&mut join_set, ctx, request, options);

        let mut results = Vec::with_capacity(self.config.len());
        let mut ended = None;

        loop {
            let joined = tokio::select! {
                biased;
                reason = ctx.done() => {
                    ended = Some(reason);
                    break;
                }
                joined = join_set.join_next() => joined,
            };
            let Some(joined) = joined else { break };

            if let Some((index, elapsed, result)) = settle(joined, &tasks, started) {
                results.push(self.record(index, elapsed, result).0);
            }
        }
        release(&mut join_set, &children, None);

        // Responders still running when the context ended are failures of this call
        if let Some(reason) = ended {
            warn!(
                reason = %reason,
                finished = results.len(),
                responders = self.config.len(),
                "Context ended before every responder finished"
            );
            for (index, provider) in self.config.providers.iter().enumerate() {
                if results.iter().any(|r| r.index == index) {
                    continue;
                }
                let failure = CollectedResult::failure(
                    &provider.name,
                    index,
                    reason.to_string(),
                    started.elapsed(),
                    provider.weight,
                );
                self.observer.on_responder_complete(&failure);
                results.push(failure);
            }
        }
        results.sort_by_key(|r| r.index);

        let pool = candidates(&results);
        if pool.is_empty() {
            if let Some(reason) = ended {
                return Err(reason.into());
            }
            return Err(EnsembleError::EmptyCandidatePool { failures: results });
        }

        let settings = &self.config.settings;
        let decision = select(
            settings.consensus_method,
            &pool,
            settings.similarity_threshold,
            self.cache,
        )?;
        debug!(
            method = %settings.consensus_method,
            votes = %decision.vote_summary(),
            groups = decision.groups.len(),
            "Consensus reached"
        );

        Ok(EnsembleOutcome {
            strategy: Strategy::Consensus,
            method: Some(settings.consensus_method),
            winner: decision.winner.clone(),
            results,
            decision: Some(decision),
            elapsed: started.elapsed(),
        })
    }

    /// Spawn one task per responder, each with its own child context.
    ///
    /// Returns the child contexts in configured order, and the index of each task.
    fn spawn_all(
        &self,
        join_set: &mut JoinSet<Invocation>,
        ctx: &CallContext,
        request: &Arc<Request>,
        options: &Arc<GenerateOptions>,
    ) -> (Vec<CallContext>, TaskIndex) {
        let mut children = Vec::with_capacity(self.config.len());
        let mut tasks = TaskIndex::with_capacity(self.config.len());
        for (index, provider) in self.config.providers.iter().enumerate() {
            let child = ctx.child_with_timeout(self.config.settings.responder_timeout);
            let task_ctx = child.clone();
            let responder = Arc::clone(&provider.responder);
            let request = Arc::clone(request);
            let options = Arc::clone(options);
            let streamed = self.streamed;

            let handle = join_set.spawn(async move {
                let (elapsed, result) =
                    invoke(responder.as_ref(), &task_ctx, &request, &options, streamed).await;
                (index, elapsed, result)
            });
            tasks.insert(handle.id(), index);
            children.push(child);
        }
        (children, tasks)
    }

    /// Turn one invocation into a [`CollectedResult`] and report it.
    fn record(
        &self,
        index: usize,
        elapsed: Duration,
        result: Result<String, ResponderError>,
    ) -> (CollectedResult, Option<ResponderError>) {
        match result {
            Ok(content) => (self.record_success(index, elapsed, content), None),
            Err(error) => (self.record_failure(index, elapsed, &error), Some(error)),
        }
    }

    fn record_success(&self, index: usize, elapsed: Duration, content: String) -> CollectedResult {
        let provider = &self.config.providers[index];
        debug!(
            responder = %provider.name,
            elapsed_ms = elapsed.as_millis() as u64,
            preview = %preview(&content, 60),
            "Responder succeeded"
        );
        let collected =
            CollectedResult::success(&provider.name, index, content, elapsed, provider.weight);
        self.observer.on_responder_complete(&collected);
        collected
    }

    fn record_failure(
        &self,
        index: usize,
        elapsed: Duration,
        error: &ResponderError,
    ) -> CollectedResult {
        let provider = &self.config.providers[index];
        warn!(responder = %provider.name, error = %error, "Responder failed");
        let collected = CollectedResult::failure(
            &provider.name,
            index,
            error.to_string(),
            elapsed,
            provider.weight,
        );
        self.observer.on_responder_complete(&collected);
        collected
    }
}

/// Unpack a joined task, turning a panic into a failure of its responder.
///
/// Returns `None` only for a task this call did not spawn.
fn settle<T>(
    joined: Result<(usize, Duration, Result<T, ResponderError>), JoinError>,
    tasks: &TaskIndex,
    started: Instant,
) -> Option<(usize, Duration, Result<T, ResponderError>)> {
    match joined {
        Ok(invocation) => Some(invocation),
        Err(e) => {
            let Some(&index) = tasks.get(&e.id()) else {
                warn!("Join error from an unknown task: {}", e);
                return None;
            };
            let reason = if e.is_panic() {
                "responder task panicked"
            } else {
                "responder task was aborted"
            };
            Some((
                index,
                started.elapsed(),
                Err(ResponderError::RequestFailed(reason.to_string())),
            ))
        }
    }
}

/// Signal every task except `keep` to stop, then stop tracking them.
///
/// Tasks wind down through their own context instead of being aborted.
fn release<T: 'static>(join_set: &mut JoinSet<T>, children: &[CallContext], keep: Option<usize>) {
    for (i, child) in children.iter().enumerate() {
        if Some(i) != keep {
            child.cancel();
        }
    }
    join_set.detach_all();
}

/// Invoke one responder, bounded by its context.
async fn invoke(
    responder: &dyn Responder,
    ctx: &CallContext,
    request: &Request,
    options: &GenerateOptions,
    streamed: bool,
) -> (Duration, Result<String, ResponderError>) {
    let start = Instant::now();
    let result = match ctx.run(fetch(responder, ctx, request, options, streamed)).await {
        Ok(result) => result,
        Err(reason) => Err(reason.into()),
    };
    (start.elapsed(), result)
}

async fn fetch(
    responder: &dyn Responder,
    ctx: &CallContext,
    request: &Request,
    options: &GenerateOptions,
    streamed: bool,
) -> Result<String, ResponderError> {
    if streamed {
        request
            .stream(responder, ctx, options)
            .await?
            .collect_text()
            .await
    } else {
        request.generate(responder, ctx, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderWeight;
    use crate::ports::progress::NoObserver;
    use crate::use_cases::test_support::{Scripted, provider};
    use ensemble_domain::{ConsensusMethod, EnsembleSettings, SimilarityThreshold};
    use std::sync::Mutex;

    fn config(providers: Vec<ProviderWeight>, strategy: Strategy) -> OrchestratorConfig {
        OrchestratorConfig::new(providers, EnsembleSettings::new(strategy))
    }

    async fn run(config: &OrchestratorConfig, ctx: &CallContext) -> Result<EnsembleOutcome, EnsembleError> {
        let cache = SimilarityCache::new();
        Racer::new(config, &cache, &NoObserver)
            .run(ctx, Request::Prompt("q".to_string()), GenerateOptions::default())
            .await
    }

    // ==================== Fastest ====================

    #[tokio::test(start_paused = true)]
    async fn test_fastest_returns_first_success() {
        let slow = Scripted::answer("slow", 100);
        let fast = Scripted::answer("fast", 10);
        let medium = Scripted::answer("medium", 50);
        let config = config(
            vec![
                provider("slow", &slow),
                provider("fast", &fast),
                provider("medium", &medium),
            ],
            Strategy::Fastest,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "fast");
        assert_eq!(outcome.winner.index, 1);
        assert!(outcome.winner.elapsed >= Duration::from_millis(10));
        assert!(outcome.winner.elapsed < Duration::from_millis(50));
        assert!(outcome.elapsed < Duration::from_millis(50));

        // Losers were signalled and never finish their work
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!slow.finished());
        assert!(!medium.finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fastest_skips_failures() {
        let broken = Scripted::failure("boom", 5);
        let working = Scripted::answer("ok", 20);
        let config = config(
            vec![provider("broken", &broken), provider("working", &working)],
            Strategy::Fastest,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "ok");
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(outcome.results[0].responder, "broken");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fastest_all_fail() {
        let config = config(
            vec![
                provider("a", &Scripted::failure("a down", 10)),
                provider("b", &Scripted::failure("b down", 5)),
            ],
            Strategy::Fastest,
        );

        match run(&config, &CallContext::new()).await {
            Err(EnsembleError::EmptyCandidatePool { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].responder, "a");
                assert_eq!(failures[1].responder, "b");
            }
            other => panic!("expected EmptyCandidatePool, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fastest_deadline() {
        let config = config(
            vec![
                provider("a", &Scripted::answer("a", 100)),
                provider("b", &Scripted::answer("b", 200)),
            ],
            Strategy::Fastest,
        );

        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        assert!(matches!(
            run(&config, &ctx).await,
            Err(EnsembleError::DeadlineExceeded)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_context_is_rejected_up_front() {
        let config = config(
            vec![provider("a", &Scripted::answer("a", 0))],
            Strategy::Fastest,
        );
        let ctx = CallContext::new();
        ctx.cancel();
        assert!(matches!(
            run(&config, &ctx).await,
            Err(EnsembleError::Cancelled)
        ));
    }

    // ==================== Primary ====================

    #[tokio::test(start_paused = true)]
    async fn test_primary_falls_back_in_order() {
        let a = Scripted::failure("primary down", 10);
        let b = Scripted::answer("secondary", 10);
        let c = Scripted::answer("tertiary", 1);
        let config = config(
            vec![provider("a", &a), provider("b", &b), provider("c", &c)],
            Strategy::Primary,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "secondary");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_wraps_around() {
        let a = Scripted::answer("first", 10);
        let b = Scripted::answer("second", 10);
        let c = Scripted::failure("down", 10);
        let mut config = config(
            vec![provider("a", &a), provider("b", &b), provider("c", &c)],
            Strategy::Primary,
        );
        config.settings.primary_index = 2;

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "first");
        assert_eq!(c.calls(), 1);
        assert_eq!(b.calls(), 0);
        // Configured order, not attempt order
        assert_eq!(outcome.results[0].responder, "a");
        assert_eq!(outcome.results[1].responder, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_all_fail_returns_last_error() {
        let config = config(
            vec![
                provider("a", &Scripted::failure("a down", 1)),
                provider("b", &Scripted::failure("b down", 1)),
            ],
            Strategy::Primary,
        );

        match run(&config, &CallContext::new()).await {
            Err(EnsembleError::Responder { responder, source }) => {
                assert_eq!(responder, "b");
                assert!(matches!(source, ResponderError::RequestFailed(msg) if msg == "b down"));
            }
            other => panic!("expected Responder error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_responder_timeout_falls_back() {
        let hanging = Scripted::hang();
        let backup = Scripted::answer("backup", 5);
        let mut config = config(
            vec![provider("hanging", &hanging), provider("backup", &backup)],
            Strategy::Primary,
        );
        config.settings.responder_timeout = Some(Duration::from_millis(20));

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "backup");
        assert_eq!(outcome.results[0].error.as_deref(), Some("Timeout"));
        assert!(outcome.elapsed >= Duration::from_millis(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_stops_when_context_ends() {
        let backup = Scripted::answer("backup", 5);
        let config = config(
            vec![provider("hanging", &Scripted::hang()), provider("backup", &backup)],
            Strategy::Primary,
        );

        let ctx = CallContext::with_timeout(Duration::from_millis(30));
        assert!(matches!(
            run(&config, &ctx).await,
            Err(EnsembleError::DeadlineExceeded)
        ));
        assert_eq!(backup.calls(), 0);
    }

    // ==================== Consensus ====================

    #[tokio::test(start_paused = true)]
    async fn test_consensus_majority_is_independent_of_completion_order() {
        // Configured order a, b, c, d; completion order d, c, b, a
        let config = config(
            vec![
                provider("a", &Scripted::answer("Paris is the capital of France.", 40)),
                provider("b", &Scripted::answer("The capital of France is Paris.", 30)),
                provider("c", &Scripted::answer("France's capital is Paris.", 30)),
                provider("d", &Scripted::answer("Berlin is the capital of Germany.", 5)),
            ],
            Strategy::Consensus,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.method, Some(ConsensusMethod::Majority));
        // b and c tie on elapsed; b is first in configured order
        assert_eq!(outcome.winner.responder, "b");
        let decision = outcome.decision.unwrap();
        assert_eq!(decision.agreement(), 3);
        let names: Vec<_> = outcome.results.iter().map(|r| r.responder.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_weighted() {
        let mut config = config(
            vec![
                provider("heavy", &Scripted::answer("The answer is a whale.", 30)).with_weight(3.0),
                provider("light-1", &Scripted::answer("It is a shark.", 10)),
                provider("light-2", &Scripted::answer("It is a shark.", 20)),
            ],
            Strategy::Consensus,
        );
        config.settings.consensus_method = ConsensusMethod::Weighted;

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.winner.responder, "heavy");
        assert_eq!(outcome.method, Some(ConsensusMethod::Weighted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_all_fail() {
        let config = config(
            vec![
                provider("a", &Scripted::failure("a down", 1)),
                provider("b", &Scripted::failure("b down", 2)),
                provider("c", &Scripted::failure("c down", 3)),
            ],
            Strategy::Consensus,
        );

        match run(&config, &CallContext::new()).await {
            Err(EnsembleError::EmptyCandidatePool { failures }) => {
                assert_eq!(failures.len(), 3);
                assert!(failures.iter().all(|f| !f.is_success()));
            }
            other => panic!("expected EmptyCandidatePool, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_votes_on_what_arrived_by_deadline() {
        let config = config(
            vec![
                provider("quick", &Scripted::answer("Paris", 10)),
                provider("stuck", &Scripted::hang()),
            ],
            Strategy::Consensus,
        );

        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let outcome = run(&config, &ctx).await.unwrap();
        assert_eq!(outcome.content(), "Paris");
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].error.as_deref(), Some("Deadline exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_deadline_without_success() {
        let config = config(
            vec![
                provider("failing", &Scripted::failure("down", 5)),
                provider("stuck", &Scripted::hang()),
            ],
            Strategy::Consensus,
        );

        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        assert!(matches!(
            run(&config, &ctx).await,
            Err(EnsembleError::DeadlineExceeded)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_similarity_threshold_changes_grouping() {
        let build = |threshold: f64| {
            let mut config = config(
                vec![
                    provider("a", &Scripted::answer("alpha beta gamma delta", 20)),
                    provider("b", &Scripted::answer("alpha beta gamma epsilon", 10)),
                ],
                Strategy::Consensus,
            );
            config.settings.consensus_method = ConsensusMethod::Similarity;
            config.settings.similarity_threshold = SimilarityThreshold::new(threshold).unwrap();
            config
        };

        let strict = run(&build(0.9), &CallContext::new()).await.unwrap();
        assert_eq!(strict.decision.unwrap().groups.len(), 2);
        // Two singletons tie on count; the faster one wins
        assert_eq!(strict.winner.responder, "b");

        let loose = run(&build(0.5), &CallContext::new()).await.unwrap();
        let decision = loose.decision.unwrap();
        assert_eq!(decision.groups.len(), 1);
        assert!(decision.is_unanimous());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_dispatch() {
        let a = Scripted::answer("a", 0);
        let mut config = config(vec![provider("a", &a)], Strategy::Primary);
        config.settings.primary_index = 4;

        assert!(matches!(
            run(&config, &CallContext::new()).await,
            Err(EnsembleError::Configuration(
                ConfigurationError::PrimaryIndexOutOfRange { index: 4, len: 1 }
            ))
        ));
        assert_eq!(a.calls(), 0);
    }

    // ==================== Task failures ====================

    #[tokio::test(start_paused = true)]
    async fn test_fastest_records_panicked_responder() {
        let config = config(
            vec![
                provider("panicky", &Scripted::panics("backend bug", 5)),
                provider("down", &Scripted::failure("down", 10)),
            ],
            Strategy::Fastest,
        );

        match run(&config, &CallContext::new()).await {
            Err(EnsembleError::EmptyCandidatePool { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].responder, "panicky");
                assert!(failures[0].error.as_deref().is_some_and(|e| e.contains("panicked")));
                assert_eq!(failures[1].responder, "down");
            }
            other => panic!("expected EmptyCandidatePool, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fastest_panic_does_not_stop_the_race() {
        let config = config(
            vec![
                provider("panicky", &Scripted::panics("backend bug", 1)),
                provider("working", &Scripted::answer("ok", 10)),
            ],
            Strategy::Fastest,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.content(), "ok");
        assert_eq!(outcome.results.len(), 2);
        assert!(!outcome.results[0].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_records_panicked_responder() {
        let config = config(
            vec![
                provider("a", &Scripted::answer("Paris is the capital of France.", 5)),
                provider("panicky", &Scripted::panics("backend bug", 1)),
            ],
            Strategy::Consensus,
        );

        let outcome = run(&config, &CallContext::new()).await.unwrap();
        assert_eq!(outcome.winner.responder, "a");
        assert_eq!(outcome.results.len(), 2);
        assert!(
            outcome.results[1]
                .error
                .as_deref()
                .is_some_and(|e| e.contains("panicked"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_consensus_deadline_signals_unfinished_responders() {
        let hanging = Scripted::hang();
        let config = config(
            vec![
                provider("quick", &Scripted::answer("Paris", 5)),
                provider("hanging", &hanging),
            ],
            Strategy::Consensus,
        );

        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let outcome = run(&config, &ctx).await.unwrap();
        assert_eq!(outcome.winner.responder, "quick");
        assert!(outcome.results[1].error.is_some());

        // The straggler is cancelled through its context rather than aborted
        let seen = hanging.last_context().unwrap();
        assert!(seen.token().is_cancelled());
    }

    // ==================== Observer ====================

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl DispatchObserver for RecordingObserver {
        fn on_dispatch_start(&self, strategy: Strategy, responders: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {} {}", strategy, responders));
        }

        fn on_responder_complete(&self, result: &CollectedResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {}", result.responder, result.is_success()));
        }

        fn on_decision(&self, outcome: &EnsembleOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("winner {}", outcome.winner.responder));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_every_step() {
        let config = config(
            vec![
                provider("a", &Scripted::failure("down", 5)),
                provider("b", &Scripted::answer("ok", 10)),
            ],
            Strategy::Primary,
        );
        let observer = RecordingObserver::default();
        let cache = SimilarityCache::new();

        Racer::new(&config, &cache, &observer)
            .run(
                &CallContext::new(),
                Request::Prompt("q".to_string()),
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            observer.events.lock().unwrap().as_slice(),
            &["start primary 2", "done a false", "done b true", "winner b"]
        );
    }
}
