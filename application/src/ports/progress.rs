//! Dispatch progress port
//!
//! Defines the interface for reporting progress during an ensemble call.

use crate::use_cases::racer::EnsembleOutcome;
use ensemble_domain::{CollectedResult, Strategy};

/// Callback for progress updates during an ensemble call
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain log lines, etc.)
pub trait DispatchObserver: Send + Sync {
    /// Called before any responder is invoked
    fn on_dispatch_start(&self, strategy: Strategy, responders: usize);

    /// Called when one responder invocation finishes, successfully or not
    ///
    /// For a streamed winner this fires at its first token, with empty content.
    fn on_responder_complete(&self, result: &CollectedResult);

    /// Called once the call has resolved a winner
    fn on_decision(&self, _outcome: &EnsembleOutcome) {}
}

/// No-op observer for when progress reporting is not needed
pub struct NoObserver;

impl DispatchObserver for NoObserver {
    fn on_dispatch_start(&self, _strategy: Strategy, _responders: usize) {}
    fn on_responder_complete(&self, _result: &CollectedResult) {}
}
