//! Responder adapters
//!
//! - [`CommandResponder`]: an external program, prompt on stdin, answer on stdout
//! - [`FixedResponder`]: canned text or a canned failure, for demos and smoke tests
//!
//! [`build_providers`] turns `[[responders]]` entries into weighted providers.

mod command;
mod factory;
mod fixed;

pub use command::CommandResponder;
pub use factory::{BuildError, build_providers, build_responder};
pub use fixed::FixedResponder;
