//! Application layer for ensemble-quorum
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{OrchestratorConfig, ProviderWeight};
pub use ports::{
    call_context::{CallContext, ContextError},
    progress::{DispatchObserver, NoObserver},
    responder::{GenerateOptions, Responder, ResponderError, StreamHandle},
};
pub use use_cases::orchestrator::Orchestrator;
pub use use_cases::racer::{EnsembleError, EnsembleOutcome, Racer, Request};
