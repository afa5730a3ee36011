use crate::constants::SOURCE_TITLE_NOISE_PREFIXES;
use crate::envelope::string_field;
use serde_json::Value;
use std::collections::HashSet;

/// A data source citation as it arrives in one `parts` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceRef {
    pub id: String,
    pub category: String,
    pub title: String,
    pub raw: String,
}

impl SourceRef {
    /// Parts are either JSON objects `{id, category, title}` or bare strings.
    pub fn parse(part: &str) -> Self {
        let raw = part.trim().to_string();
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(obj)) => Self {
                id: string_field(&obj, "id"),
                category: string_field(&obj, "category"),
                title: string_field(&obj, "title"),
                raw,
            },
            _ => Self {
                title: raw.clone(),
                raw,
                ..Self::default()
            },
        }
    }

    pub fn dedup_key(&self) -> &str {
        if !self.id.is_empty() {
            &self.id
        } else if !self.title.is_empty() {
            &self.title
        } else {
            &self.raw
        }
    }

    pub fn display(&self) -> String {
        let mut title = match self.title.rfind('.') {
            Some(idx) => &self.title[idx + 1..],
            None => self.title.as_str(),
        };
        for prefix in SOURCE_TITLE_NOISE_PREFIXES {
            if let Some(rest) = title.strip_prefix(prefix) {
                title = rest;
            }
        }
        let title = if title.is_empty() {
            self.dedup_key()
        } else {
            title
        };

        if self.category.is_empty() {
            title.to_string()
        } else {
            format!("[{}] {}", self.category, title)
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceBatch {
    /// The section header has not been printed yet in this stream.
    pub show_header: bool,
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SourceTracker {
    seen_source_keys: HashSet<String>,
    header_printed: bool,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, parts: &[String]) -> SourceBatch {
        let mut lines = Vec::new();
        for part in parts {
            if part.trim().is_empty() {
                continue;
            }
            let source = SourceRef::parse(part);
            if self.seen_source_keys.insert(source.dedup_key().to_string()) {
                lines.push(source.display());
            } else {
                tracing::trace!("[SOURCES] duplicate source {}", source.dedup_key());
            }
        }

        let show_header = !lines.is_empty() && !self.header_printed;
        if show_header {
            self.header_printed = true;
        }
        SourceBatch { show_header, lines }
    }

    pub fn seen(&self) -> usize {
        self.seen_source_keys.len()
    }
}
