use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BR_TAG: Regex = Regex::new(r"(?i)<br\s*/?>").expect("Invalid br regex");
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]+>").expect("Invalid tag regex");
}

/// Safely returns a prefix of the string with at most `max_chars` characters.
/// This respects UTF-8 character boundaries.
pub fn prefix_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The part of `s` after byte offset `from`. An offset inside a multi-byte
/// character moves forward to the next boundary; one past the end yields "".
pub fn tail_from(s: &str, from: usize) -> &str {
    if from >= s.len() {
        return "";
    }
    let mut start = from;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// `<br>` variants become newlines, every other tag is removed.
pub fn strip_html(s: &str) -> String {
    if !s.contains('<') {
        return s.to_string();
    }
    let with_breaks = BR_TAG.replace_all(s, "\n");
    ANY_TAG.replace_all(&with_breaks, "").into_owned()
}

/// `LOG_ANALYSIS` -> `Log analysis`.
pub fn humanize_enum(s: &str) -> String {
    let lowered = s.trim().to_lowercase().replace('_', " ");
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// True when the text is wrapped in a single pair of parentheses.
pub fn is_parenthesized(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')')
}
