//! Text similarity scoring
//!
//! The score is the Jaccard overlap of the two texts' content-word sets.
//! Words are lowercased alphanumeric runs, possessive `'s` is stripped and a
//! short list of function words is ignored so that paraphrases such as
//! "Paris is the capital of France." and "The capital of France is Paris."
//! score 1.0.
//!
//! Contract:
//! - identical inputs score exactly 1.0
//! - `compute_similarity(a, b) == compute_similarity(b, a)`
//! - the result is always within `[0, 1]`
//! - texts with no words in common score 0.0

use std::collections::HashSet;

/// Function words ignored when comparing content.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "by", "for", "in", "is", "it", "its", "of",
    "on", "or", "that", "the", "this", "to", "was", "were", "with",
];

/// Compute the similarity of two texts without any caching.
pub fn compute_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let words_a = words(a);
    let words_b = words(b);

    let content_a = content_words(&words_a);
    let content_b = content_words(&words_b);

    // A side made only of function words falls back to comparing every word
    if content_a.is_empty() || content_b.is_empty() {
        return jaccard(&words_a, &words_b);
    }
    jaccard(&content_a, &content_b)
}

/// Normalized word set of a text.
fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '’'))
        .map(|w| {
            w.strip_suffix("'s")
                .or_else(|| w.strip_suffix("’s"))
                .unwrap_or(w)
        })
        .map(|w| w.replace(['\'', '’'], ""))
        .filter(|w| !w.is_empty())
        .collect()
}

fn content_words(words: &HashSet<String>) -> HashSet<String> {
    words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .cloned()
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}
