//! Text normalization helpers shared by the classifier and the integrator.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest snippet stored on an entry, in characters.
pub const SNIPPET_MAX_CHARS: usize = 120;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lower-case the text and remove all whitespace.
///
/// Keywords are matched by substring containment against this form, which
/// keeps CJK text (no word boundaries) and spaced Latin text comparable.
pub fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(&text.to_lowercase(), "").into_owned()
}

/// Trimmed text with newlines collapsed to spaces, cut to `max_chars`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.trim().replace('\n', " ").chars().take(max_chars).collect()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
