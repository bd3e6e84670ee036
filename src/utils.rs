//! Text helpers shared by the feed parser, the generator and the orchestrator.
//!
//! This module provides:
//! - String truncation for logging and for platform length ceilings
//! - HTML to plain-text cleanup
//! - JSON error detection for handling LLM response truncation
//! - Hashtag extraction

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off (e.g., due to token limits), the
/// resulting JSON will fail to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Strip tags from an HTML fragment, decode entities and normalize whitespace.
pub fn clean_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().join(" ");
    collapse_whitespace(&text)
}

pub const ELLIPSIS: &str = "...";

/// Shorten `s` to at most `max_chars` characters, cutting at the last word
/// boundary and appending `...`.
///
/// Strings that already fit are returned unchanged. Counting is in chars,
/// not bytes, so non-Latin text is measured the way platforms measure it.
/// Below three chars there is no room for the ellipsis and `s` is cut bare.
pub fn truncate_at_word(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars < ELLIPSIS.len() {
        return s.chars().take(max_chars).collect();
    }
    let budget = max_chars - ELLIPSIS.len();
    let head: String = s.chars().take(budget).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end(),
        _ => head.as_str(),
    };
    format!("{cut}{ELLIPSIS}")
}

/// Extract `#hashtags` in order of first appearance, without duplicates.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect()
}
