//! Console output formatter for ensemble outcomes

use crate::output::formatter::OutputFormatter;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use ensemble_application::EnsembleOutcome;
use ensemble_domain::{CollectedResult, ConsensusDecision};
use serde::Serialize;

/// JSON document: the outcome plus when it was produced
#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    outcome: &'a EnsembleOutcome,
}

/// Formats ensemble outcomes for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Force colors off (or back to terminal detection) for all output.
    pub fn set_color_enabled(enabled: bool) {
        if enabled {
            colored::control::unset_override();
        } else {
            colored::control::set_override(false);
        }
    }

    /// Format every response, the vote and the answer
    pub fn format(outcome: &EnsembleOutcome) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Ensemble Results"));
        output.push('\n');

        let strategy = match outcome.method {
            Some(method) => format!("{} ({})", outcome.strategy, method),
            None => outcome.strategy.to_string(),
        };
        output.push_str(&format!("{} {}\n", "Strategy:".cyan().bold(), strategy));
        output.push_str(&format!(
            "{} {}\n",
            "Responders:".cyan().bold(),
            outcome
                .results
                .iter()
                .map(|r| r.responder.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        output.push_str(&Self::section_header("Responses"));
        for result in &outcome.results {
            output.push_str(&Self::response(result));
        }

        if let Some(ref decision) = outcome.decision {
            output.push_str(&Self::section_header("Vote"));
            output.push_str(&Self::vote(decision));
        }

        output.push_str(&Self::section_header("Answer"));
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Winner: {}", outcome.winner.responder).green().bold(),
            outcome.content()
        ));

        output.push_str(&format!(
            "\n{}\n",
            format!("Completed in {} ms", outcome.elapsed.as_millis()).dimmed()
        ));
        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(outcome: &EnsembleOutcome) -> String {
        let report = JsonReport {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            outcome,
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }

    /// The winning answer only
    pub fn format_answer(outcome: &EnsembleOutcome) -> String {
        outcome.content().trim_end().to_string()
    }

    fn response(result: &CollectedResult) -> String {
        let title = format!(
            "── {} ({} ms) ──",
            result.responder,
            result.elapsed.as_millis()
        );
        match result.error {
            None => format!(
                "\n{}\n{}\n",
                title.yellow().bold(),
                Self::indent(result.content.trim_end(), "  ")
            ),
            Some(ref error) => format!("\n{}\nError: {}\n", title.red().bold(), error),
        }
    }

    fn vote(decision: &ConsensusDecision) -> String {
        let total: usize = decision.groups.iter().map(|g| g.members.len()).sum();
        let mut output = format!(
            "\n{} {} of {} agree (method {}, threshold {:.2})\n",
            decision.vote_summary(),
            decision.agreement(),
            total,
            decision.method,
            decision.threshold
        );

        for (i, group) in decision.groups.iter().enumerate() {
            let line = format!(
                "{} (weight {:.1})",
                group.members.join(", "),
                group.total_weight
            );
            if i == decision.winning_group {
                output.push_str(&format!("  {} {}\n", "*".green(), line.green()));
            } else {
                output.push_str(&format!("  {} {}\n", "-".dimmed(), line));
            }
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_full(&self, outcome: &EnsembleOutcome) -> String {
        Self::format(outcome)
    }

    fn format_json(&self, outcome: &EnsembleOutcome) -> String {
        Self::format_json(outcome)
    }

    fn format_answer(&self, outcome: &EnsembleOutcome) -> String {
        Self::format_answer(outcome)
    }
}
