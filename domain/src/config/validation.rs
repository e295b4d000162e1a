//! Structured configuration issues.
//!
//! Configuration files are checked as a whole and every problem is reported
//! at once, each with a severity. `Error` issues make the configuration
//! unusable; `Warning` issues fall back to a default.
//!
//! # Examples
//!
//! ```
//! use ensemble_domain::config::{ConfigIssue, ConfigIssueCode, Severity};
//!
//! let issue = ConfigIssue::error(
//!     ConfigIssueCode::DuplicateResponder { name: "local".to_string() },
//!     "responder name 'local' is used twice",
//! );
//! assert!(issue.is_error());
//! ```

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default is used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssueCode {
    /// No `[[responders]]` entries.
    NoResponders,
    /// A string field holds a value outside its enum.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// Threshold outside `(0, 1]`.
    InvalidThreshold { value: f64 },
    /// Negative or non-finite responder weight.
    InvalidWeight { responder: String, weight: f64 },
    /// A field required by the responder kind is missing.
    MissingField { responder: String, field: String },
    /// Two responders share a name.
    DuplicateResponder { name: String },
    /// `primary` does not index a configured responder.
    PrimaryOutOfRange { index: usize, len: usize },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
