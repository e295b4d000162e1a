//! Configuration file loading for ensemble-quorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./ensemble.toml` or `./.ensemble.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/ensemble-quorum/config.toml`
//! 4. Fallback: `~/.config/ensemble-quorum/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileEnsembleConfig, FileOutputConfig, FileResponderConfig,
    FileResponderKind,
};
pub use loader::ConfigLoader;
