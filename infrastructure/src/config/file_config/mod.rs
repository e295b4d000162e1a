//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod ensemble;
mod output;
mod responders;

pub use ensemble::FileEnsembleConfig;
pub use output::FileOutputConfig;
pub use responders::{FileResponderConfig, FileResponderKind};

use ensemble_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Dispatch and voting settings
    pub ensemble: FileEnsembleConfig,
    /// Responders, in configured order
    pub responders: Vec<FileResponderConfig>,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Enum and threshold values in `[ensemble]`
    /// 2. Every `[[responders]]` entry on its own
    /// 3. Responder name uniqueness
    /// 4. That `ensemble.primary` points at a configured responder
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. [ensemble]
        issues.extend(self.ensemble.to_settings().1);

        // 2. [[responders]]
        if self.responders.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NoResponders,
                "no [[responders]] configured",
            ));
        }
        for responder in &self.responders {
            issues.extend(responder.validate());
        }

        // 3. Duplicate names
        let mut seen = HashSet::new();
        for responder in &self.responders {
            if !responder.name.is_empty() && !seen.insert(responder.name.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateResponder {
                        name: responder.name.clone(),
                    },
                    format!("responder name '{}' is used more than once", responder.name),
                ));
            }
        }

        // 4. Primary index
        let len = self.responders.len();
        if len > 0 && self.ensemble.primary >= len {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::PrimaryOutOfRange {
                    index: self.ensemble.primary,
                    len,
                },
                format!(
                    "ensemble.primary: {} is out of range for {} responders",
                    self.ensemble.primary, len
                ),
            ));
        }

        issues
    }
}
