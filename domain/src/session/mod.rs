//! Conversation and streaming primitives shared by every responder.
//!
//! - [`entities::Message`]: a role-tagged message for message-based calls
//! - [`stream::StreamEvent`]: one event of a streaming response

pub mod entities;
pub mod stream;
