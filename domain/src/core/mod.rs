//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ConfigurationError`]: invalid ensemble configuration
//! - [`error::ConsensusError`]: a selector could not pick a winner
//! - [`string::preview`]: one-line, UTF-8 safe preview of a response

pub mod error;
pub mod string;
