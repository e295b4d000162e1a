//! Streaming response events.
//!
//! A stream is a finite, single-pass sequence of [`StreamEvent::Delta`]
//! chunks terminated by exactly one terminal event, either
//! [`StreamEvent::Completed`] or [`StreamEvent::Error`].

/// An event in a streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk from the responder.
    Delta(String),
    /// The complete response text (signals stream end).
    Completed(String),
    /// An error that occurred during streaming (signals stream end).
    Error(String),
}

impl StreamEvent {
    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }

    /// Returns true if this event carries output, i.e. the stream has
    /// started producing tokens.
    pub fn is_token(&self) -> bool {
        matches!(self, StreamEvent::Delta(_) | StreamEvent::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_token_but_not_terminal() {
        let event = StreamEvent::Delta("Par".to_string());
        assert!(event.is_token());
        assert!(!event.is_terminal());
    }

    #[test]
    fn completed_is_token_and_terminal() {
        let event = StreamEvent::Completed("Paris".to_string());
        assert!(event.is_token());
        assert!(event.is_terminal());
    }

    #[test]
    fn error_is_terminal_without_output() {
        let event = StreamEvent::Error("backend closed".to_string());
        assert!(!event.is_token());
        assert!(event.is_terminal());
    }
}
