//! CLI entrypoint for Ensemble Quorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use ensemble_application::{
    CallContext, GenerateOptions, Orchestrator, OrchestratorConfig, Request,
};
use ensemble_domain::{ConfigIssue, OutputFormat, SimilarityCache, StreamEvent};
use ensemble_infrastructure::{AtomicCacheStats, ConfigLoader, FileConfig, build_providers};
use ensemble_presentation::{Cli, ConsoleFormatter, OutputFormatter, ProgressReporter, SimpleProgress};
use std::io::{IsTerminal, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting Ensemble Quorum");

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    // === Configuration ===
    let file_config = load_config(&cli)?;
    report_issues(&file_config.validate())?;

    ConsoleFormatter::set_color_enabled(!cli.no_color && file_config.output.color);

    let prompt = read_prompt(cli.prompt.as_deref())?;
    let mut options = GenerateOptions::default();
    if let Some(ref system) = cli.system {
        options = options.with_system_prompt(system.clone());
    }
    if let Some(temperature) = cli.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(max_tokens) = cli.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }

    // === Dependency Injection ===
    let stats = Arc::new(AtomicCacheStats::new());
    let mut cache = SimilarityCache::with_observer(stats.clone());
    if let Some(max_entries) = file_config.ensemble.cache_max_entries {
        cache = cache.with_max_entries(max_entries);
    }
    let cache = Arc::new(cache);
    let (settings, _) = file_config.ensemble.to_settings();
    let providers = build_providers(&file_config)?;

    let mut orchestrator =
        Orchestrator::from_config(OrchestratorConfig::new(providers, settings))?.with_cache(cache);
    if let Some(strategy) = cli.strategy {
        orchestrator = orchestrator.with_strategy(strategy.into());
    }
    if let Some(method) = cli.method {
        orchestrator = orchestrator.with_consensus_method(method.into());
    }
    if let Some(threshold) = cli.threshold {
        orchestrator = orchestrator
            .with_similarity_threshold(threshold)
            .context("invalid --threshold")?;
    }
    if let Some(primary) = cli.primary {
        orchestrator = orchestrator
            .with_primary_index(primary)
            .context("invalid --primary")?;
    }
    if let Some(ms) = cli.responder_timeout_ms {
        orchestrator = orchestrator.with_responder_timeout(Some(Duration::from_millis(ms)));
    }

    let reporter = (!cli.quiet && std::io::stderr().is_terminal())
        .then(|| Arc::new(ProgressReporter::new()));
    if let Some(ref reporter) = reporter {
        orchestrator = orchestrator.with_observer(reporter.clone());
    } else if !cli.quiet {
        orchestrator = orchestrator.with_observer(Arc::new(SimpleProgress));
    }

    // === Call context ===
    let timeout = cli
        .timeout_ms
        .map(Duration::from_millis)
        .or_else(|| file_config.ensemble.timeout());
    let ctx = match timeout {
        Some(timeout) => CallContext::with_timeout(timeout),
        None => CallContext::new(),
    };
    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the call");
            token.cancel();
        }
    });

    info!(
        strategy = %orchestrator.strategy(),
        responders = orchestrator.config().len(),
        "Dispatching"
    );

    if cli.stream {
        let handle = orchestrator
            .dispatch_stream(&ctx, Request::Prompt(prompt), &options)
            .await;
        if let Some(ref reporter) = reporter {
            reporter.finish();
        }
        print_stream(handle?).await?;
    } else {
        let outcome = orchestrator.dispatch(&ctx, &prompt, &options).await;
        if let Some(ref reporter) = reporter {
            reporter.finish();
        }
        let outcome = outcome?;

        let format = cli
            .output
            .map(OutputFormat::from)
            .or(file_config.output.format)
            .unwrap_or_default();
        println!("{}", ConsoleFormatter.render(&outcome, format));
    }

    if cli.stats {
        let snapshot = stats.snapshot();
        eprintln!(
            "similarity cache: {} hits, {} misses, {} entries",
            snapshot.hits,
            snapshot.misses,
            orchestrator.cache().len()
        );
    }

    Ok(())
}

/// Initialize logging based on verbosity level.
///
/// Logs go to stderr, and additionally to `log_file` when given. The returned
/// guard must live until exit so buffered file output is flushed.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(stderr_layer)
                .init();
            Ok(None)
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    if let Some(ref path) = cli.config {
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
    }
    ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")
}

/// Print every issue; fail if any of them is an error.
fn report_issues(issues: &[ConfigIssue]) -> Result<()> {
    for issue in issues {
        eprintln!("{}", issue);
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("configuration has {} error(s)", errors);
    }
    Ok(())
}

fn read_prompt(arg: Option<&str>) -> Result<String> {
    let prompt = match arg {
        Some(prompt) => prompt.to_string(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read the prompt from stdin")?;
            buffer
        }
    };
    if prompt.trim().is_empty() {
        bail!("Prompt is required: pass it as an argument or on stdin");
    }
    Ok(prompt)
}

async fn print_stream(mut handle: ensemble_application::StreamHandle) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut printed = false;

    while let Some(event) = handle.next().await {
        match event {
            StreamEvent::Delta(chunk) => {
                print!("{}", chunk);
                stdout.flush()?;
                printed |= !chunk.is_empty();
            }
            StreamEvent::Completed(text) => {
                if !printed {
                    print!("{}", text);
                }
                println!();
                return Ok(());
            }
            StreamEvent::Error(e) => {
                println!();
                bail!("stream failed: {}", e);
            }
        }
    }
    println!();
    Ok(())
}
