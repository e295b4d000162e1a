//! Output formatting for ensemble outcomes

pub mod console;
pub mod formatter;
