//! Progress reporting for ensemble calls

use colored::Colorize;
use ensemble_application::{DispatchObserver, EnsembleOutcome};
use ensemble_domain::{CollectedResult, Strategy};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};

/// Reports progress during an ensemble call with a progress bar
pub struct ProgressReporter {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bar: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn strategy_display_name(strategy: Strategy) -> &'static str {
        match strategy {
            Strategy::Fastest => "Racing",
            Strategy::Primary => "Asking primary",
            Strategy::Consensus => "Collecting votes",
        }
    }

    /// Remove the bar, whether or not the call resolved a winner.
    pub fn finish(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchObserver for ProgressReporter {
    fn on_dispatch_start(&self, strategy: Strategy, responders: usize) {
        let pb = self.multi.add(ProgressBar::new(responders as u64));
        pb.set_style(Self::bar_style());
        pb.set_prefix(Self::strategy_display_name(strategy));
        pb.set_message("Starting...");

        if let Some(previous) = self.lock().replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn on_responder_complete(&self, result: &CollectedResult) {
        if let Some(pb) = self.lock().as_ref() {
            let status = if result.is_success() {
                format!("{} {}", "v".green(), result.responder)
            } else {
                format!("{} {}", "x".red(), result.responder)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_decision(&self, outcome: &EnsembleOutcome) {
        if let Some(pb) = self.lock().take() {
            pb.finish_with_message(format!(
                "{} {}",
                "winner:".green(),
                outcome.winner.responder
            ));
        }
    }
}

/// Simple text-based progress (no fancy UI), written to stderr
pub struct SimpleProgress;

impl DispatchObserver for SimpleProgress {
    fn on_dispatch_start(&self, strategy: Strategy, responders: usize) {
        eprintln!(
            "{} {} ({} responders)",
            "->".cyan(),
            ProgressReporter::strategy_display_name(strategy).bold(),
            responders
        );
    }

    fn on_responder_complete(&self, result: &CollectedResult) {
        match result.error {
            None => eprintln!(
                "  {} {} ({} ms)",
                "v".green(),
                result.responder,
                result.elapsed.as_millis()
            ),
            Some(ref error) => eprintln!("  {} {} (failed: {})", "x".red(), result.responder, error),
        }
    }

    fn on_decision(&self, outcome: &EnsembleOutcome) {
        eprintln!("  {} {}", "winner:".green(), outcome.winner.responder);
    }
}
