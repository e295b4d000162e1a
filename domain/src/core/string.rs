//! String utilities for the domain layer.

/// Truncate a string to a maximum byte length, appending an ellipsis.
///
/// Truncation always lands on a UTF-8 character boundary. Used for
/// one-line previews of responder output in logs and console summaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Collapse a possibly multi-line response into a single-line preview.
pub fn preview(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, max_len)
}
