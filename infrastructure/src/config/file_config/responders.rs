//! Responder configuration from TOML (`[[responders]]` array)

use ensemble_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Kind of responder adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileResponderKind {
    /// External program: prompt on stdin, answer on stdout
    #[default]
    Command,
    /// Canned text (or canned failure) after an optional delay
    Fixed,
}

impl FileResponderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileResponderKind::Command => "command",
            FileResponderKind::Fixed => "fixed",
        }
    }
}

/// One `[[responders]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResponderConfig {
    /// Display name, unique within the ensemble
    pub name: String,
    pub kind: FileResponderKind,
    /// Voting weight
    pub weight: f64,

    // command
    pub command: Option<String>,
    pub args: Vec<String>,

    // fixed
    pub text: Option<String>,
    /// Fail with this message instead of answering
    pub fail: Option<String>,
    pub delay_ms: u64,
}

impl Default for FileResponderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: FileResponderKind::default(),
            weight: 1.0,
            command: None,
            args: Vec::new(),
            text: None,
            fail: None,
            delay_ms: 0,
        }
    }
}

impl FileResponderConfig {
    /// Check this entry on its own (uniqueness is checked by the caller).
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(self.missing("name"));
        }

        if !(self.weight.is_finite() && self.weight >= 0.0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidWeight {
                    responder: self.name.clone(),
                    weight: self.weight,
                },
                format!(
                    "responders.{}.weight: {} must be finite and >= 0",
                    self.name, self.weight
                ),
            ));
        }

        match self.kind {
            FileResponderKind::Command => {
                if self.command.as_deref().is_none_or(|c| c.trim().is_empty()) {
                    issues.push(self.missing("command"));
                }
            }
            FileResponderKind::Fixed => {
                if self.text.is_none() && self.fail.is_none() {
                    issues.push(self.missing("text"));
                }
            }
        }

        issues
    }

    fn missing(&self, field: &str) -> ConfigIssue {
        ConfigIssue::error(
            ConfigIssueCode::MissingField {
                responder: self.name.clone(),
                field: field.to_string(),
            },
            format!(
                "responders.{}: '{}' is required for kind '{}'",
                self.name,
                field,
                self.kind.as_str()
            ),
        )
    }
}
