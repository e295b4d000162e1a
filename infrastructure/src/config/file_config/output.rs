//! `[output]` table: how the answer is rendered.

use ensemble_domain::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Rendering used when `--output` is not given; `None` means answer only.
    pub format: Option<OutputFormat>,
    /// `false` disables ANSI colors even on a terminal.
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}
