//! Pure text helpers shared by the analysis operations.
//!
//! Nothing here calls the model: word counting, bounded samples of a
//! document, and parsing of the free-text list answers models return.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Sentiment;

/// A line opening with a capitalized label and a colon: `ALICE: hello`.
static SPEAKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z][^:\n]{0,40}):").unwrap());

/// A run of text ending in a question mark.
static QUESTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?\n]*\?").unwrap());

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The first `max_chars` characters of `text`.
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The last `max_chars` characters of `text`.
pub fn tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Whole text when it fits in `threshold` chars, otherwise
/// `head + "..." + tail`.
pub fn head_tail_sample(text: &str, threshold: usize, head_chars: usize, tail_chars: usize) -> String {
    if text.chars().count() > threshold {
        format!("{}...{}", head(text, head_chars), tail(text, tail_chars))
    } else {
        text.to_string()
    }
}

/// Strip leading bullet and numbering markers (`- `, `* `, `• `, `1. `, `2) `).
pub fn strip_list_marker(line: &str) -> &str {
    let mut rest = line
        .trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'))
        .trim_start();

    // Numbering only counts when followed by `.`/`)` and a space, so
    // "3D printing" and "2.5 million" survive.
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(marker_rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            if marker_rest.is_empty() || marker_rest.starts_with(char::is_whitespace) {
                rest = marker_rest;
            }
        }
    }
    rest.trim()
}

/// Non-empty lines with markers stripped, in order, capped at `max`.
pub fn parse_lines(response: &str, max: usize) -> Vec<String> {
    response
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}

/// Comma-separated entries, trimmed of whitespace, quotes and trailing
/// periods, with empty entries dropped.
pub fn parse_comma_list(response: &str) -> Vec<String> {
    response
        .split([',', '\n'])
        .map(clean_entry)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_entry(entry: &str) -> &str {
    strip_list_marker(entry)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '.' | '`'))
}

/// Case-insensitive de-duplication keeping the first spelling seen.
pub fn dedup_case_insensitive<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

/// Map a free-text answer onto the canonical sentiment labels.
///
/// Checked in the order Positive, Negative, Mixed; anything else is Neutral.
pub fn normalize_sentiment(response: &str) -> Sentiment {
    let lowered = response.to_lowercase();
    if lowered.contains("positive") {
        Sentiment::Positive
    } else if lowered.contains("negative") {
        Sentiment::Negative
    } else if lowered.contains("mixed") {
        Sentiment::Mixed
    } else {
        Sentiment::Neutral
    }
}

/// `true` when a speaker answer says the text is not a multi-speaker transcript.
pub fn is_not_applicable(response: &str) -> bool {
    let lowered = response.trim().trim_matches(|c: char| matches!(c, '"' | '\'')).to_lowercase();
    lowered.is_empty()
        || lowered.starts_with("none")
        || lowered.starts_with("n/a")
        || lowered.starts_with("not applicable")
}

/// Labels of lines shaped like `NAME: utterance`, de-duplicated in order
/// of first appearance.
pub fn structural_speakers(text: &str) -> Vec<String> {
    let labels = SPEAKER_LINE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|label| !label.is_empty());
    let mut seen = HashSet::new();
    labels.filter(|label| seen.insert(label.clone())).collect()
}

/// The first `max` question sentences of `text`, trimmed.
pub fn questions(text: &str, max: usize) -> Vec<&str> {
    QUESTION
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|q| q.len() > 1)
        .take(max)
        .collect()
}

/// Lines that carry a quotation, with markers and surrounding quotes removed.
pub fn parse_quotes(response: &str, max: usize) -> Vec<String> {
    const QUOTE_CHARS: [char; 4] = ['"', '\'', '“', '”'];
    response
        .lines()
        .filter(|line| line.contains(QUOTE_CHARS))
        .map(|line| strip_list_marker(line).trim_matches(|c: char| c.is_whitespace() || QUOTE_CHARS.contains(&c)))
        .filter(|quote| !quote.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}
