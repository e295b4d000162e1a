//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod orchestrator;
pub mod racer;

#[cfg(test)]
pub(crate) mod test_support;
