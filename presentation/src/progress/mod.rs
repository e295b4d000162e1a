//! Progress reporting during an ensemble call

pub mod reporter;
