use crate::str_utils::is_parenthesized;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref FOUND_RESULTS: Regex =
        Regex::new(r"^\(Found \d+ results\)$").expect("Invalid found-results regex");
}

/// Collapse count-bearing status templates to one key so a changing count
/// does not read as a new milestone. First matching rule wins.
pub fn normalize_progress_key(text: &str) -> String {
    let trimmed = text.trim();
    if FOUND_RESULTS.is_match(trimmed) {
        return "(Found N results)".to_string();
    }
    if trimmed.contains("result streams") {
        return "(Analyzing N result streams)".to_string();
    }
    if trimmed.contains("datas") && trimmed.contains("ources") {
        return "(Selected N data sources)".to_string();
    }
    trimmed.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// First sighting, printed as a permanent line.
    Milestone(String),
    /// Repeat of a parenthesised "working" line, shown on the activity line.
    Activity(String),
    Suppressed,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    seen_progress_keys: HashSet<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, text: &str) -> ProgressUpdate {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ProgressUpdate::Suppressed;
        }

        let key = normalize_progress_key(trimmed);
        if self.seen_progress_keys.insert(key) {
            return ProgressUpdate::Milestone(trimmed.to_string());
        }

        if is_parenthesized(trimmed) {
            ProgressUpdate::Activity(trimmed.to_string())
        } else {
            ProgressUpdate::Suppressed
        }
    }

    pub fn seen(&self) -> usize {
        self.seen_progress_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_rules_in_order() {
        assert_eq!(normalize_progress_key("(Found 9 results)"), "(Found N results)");
        assert_eq!(
            normalize_progress_key("(Analyzing 3 result streams)"),
            "(Analyzing N result streams)"
        );
        assert_eq!(
            normalize_progress_key("Selected 4 datasources"),
            "(Selected N data sources)"
        );
        assert_eq!(
            normalize_progress_key("Querying datasets"),
            "Querying datasets"
        );
        // "Found" without the exact template falls through.
        assert_eq!(
            normalize_progress_key("Found 9 results"),
            "Found 9 results"
        );
    }

    #[test]
    fn count_change_is_suppressed_as_activity() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.observe("(Found 9 results)"),
            ProgressUpdate::Milestone("(Found 9 results)".to_string())
        );
        assert_eq!(
            tracker.observe("(Found 42 results)"),
            ProgressUpdate::Activity("(Found 42 results)".to_string())
        );
        assert_eq!(tracker.seen(), 1);
    }

    #[test]
    fn repeated_plain_status_is_suppressed() {
        let mut tracker = ProgressTracker::new();
        assert!(matches!(
            tracker.observe("Planning investigation"),
            ProgressUpdate::Milestone(_)
        ));
        assert_eq!(
            tracker.observe("Planning investigation"),
            ProgressUpdate::Suppressed
        );
        assert_eq!(tracker.observe("   "), ProgressUpdate::Suppressed);
    }
}
