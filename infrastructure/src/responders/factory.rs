//! Build responders from `[[responders]]` entries

use super::{CommandResponder, FixedResponder};
use crate::config::{FileConfig, FileResponderConfig, FileResponderKind};
use ensemble_application::{ProviderWeight, Responder};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("No responders configured")]
    NoResponders,

    #[error("Responder '{responder}' is missing '{field}'")]
    MissingField { responder: String, field: String },
}

/// Build the adapter described by one entry.
pub fn build_responder(entry: &FileResponderConfig) -> Result<Arc<dyn Responder>, BuildError> {
    let missing = |field: &str| BuildError::MissingField {
        responder: entry.name.clone(),
        field: field.to_string(),
    };

    let responder: Arc<dyn Responder> = match entry.kind {
        FileResponderKind::Command => {
            let program = entry
                .command
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| missing("command"))?;
            Arc::new(CommandResponder::new(program, entry.args.clone()))
        }
        FileResponderKind::Fixed => {
            let fixed = match (&entry.fail, &entry.text) {
                (Some(message), _) => FixedResponder::failing(message.clone()),
                (None, Some(text)) => FixedResponder::new(text.clone()),
                (None, None) => return Err(missing("text")),
            };
            Arc::new(fixed.with_delay(Duration::from_millis(entry.delay_ms)))
        }
    };
    Ok(responder)
}

/// Turn every `[[responders]]` entry into a weighted provider, in order.
pub fn build_providers(config: &FileConfig) -> Result<Vec<ProviderWeight>, BuildError> {
    if config.responders.is_empty() {
        return Err(BuildError::NoResponders);
    }

    config
        .responders
        .iter()
        .map(|entry| {
            debug!(
                responder = %entry.name,
                kind = entry.kind.as_str(),
                weight = entry.weight,
                "Building responder"
            );
            let responder = build_responder(entry)?;
            Ok(ProviderWeight::new(entry.name.clone(), responder).with_weight(entry.weight))
        })
        .collect()
}
