//! Syntax rules for external reference ids (grade, track, strand, subject).
//!
//! Reference ids are opaque keys owned by the school catalog. Core only checks
//! their shape; it never resolves them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest accepted reference id.
pub const MAX_REFERENCE_CHARS: usize = 64;

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]*$").expect("valid reference regex"));

/// Returns whether `value` is a syntactically valid reference id.
pub fn is_valid_reference(value: &str) -> bool {
    value.chars().count() <= MAX_REFERENCE_CHARS && REFERENCE_RE.is_match(value)
}

/// Normalizes user input into an optional reference.
///
/// Blank input clears the reference; anything else is trimmed but otherwise
/// kept verbatim so malformed values still reach the guard and get reported.
pub fn normalize_reference(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
