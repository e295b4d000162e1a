//! Output formatter trait

use ensemble_application::EnsembleOutcome;
use ensemble_domain::OutputFormat;

/// Trait for formatting ensemble outcomes
pub trait OutputFormatter {
    /// Every response, the vote breakdown and the answer
    fn format_full(&self, outcome: &EnsembleOutcome) -> String;

    /// Format as JSON
    fn format_json(&self, outcome: &EnsembleOutcome) -> String;

    /// The winning answer only
    fn format_answer(&self, outcome: &EnsembleOutcome) -> String;

    /// Dispatch on `format`
    fn render(&self, outcome: &EnsembleOutcome, format: OutputFormat) -> String {
        match format {
            OutputFormat::Answer => self.format_answer(outcome),
            OutputFormat::Full => self.format_full(outcome),
            OutputFormat::Json => self.format_json(outcome),
        }
    }
}
