//! Infrastructure layer for ensemble-quorum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod metrics;
pub mod responders;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileEnsembleConfig, FileOutputConfig,
    FileResponderConfig, FileResponderKind,
};
pub use metrics::{AtomicCacheStats, CacheStatsSnapshot};
pub use responders::{
    BuildError, CommandResponder, FixedResponder, build_providers, build_responder,
};
