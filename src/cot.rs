//! Chain-of-thought rounds.
//!
//! Servers describe the same investigation steps in three shapes: explicit
//! `cot_start`/`cot_delta`/`cot_end` framing, `is_delta` flagged fragments on
//! plain `message` events, and legacy events whose `investigation` field is
//! the entire text so far. [`CotFrame::resolve`] maps each event to one of
//! these once, and [`CotTracker::apply`] runs a single mutation routine over
//! one active [`Round`], yielding what to print.

use crate::constants::{
    CATEGORY_ENUM_MARKER, EVENT_COT_DELTA, EVENT_COT_END, EVENT_COT_START, STATUS_ENUM_MARKER,
};
use crate::envelope::string_field;
use crate::round::{Round, TextMode};
use crate::str_utils::humanize_enum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CotFrame {
    ExplicitStart,
    ExplicitDelta,
    ExplicitEnd,
    MetadataDelta,
    LegacyFullText,
}

impl CotFrame {
    pub fn resolve(event_type: &str, is_delta: bool) -> Self {
        match event_type {
            EVENT_COT_START => Self::ExplicitStart,
            EVENT_COT_DELTA => Self::ExplicitDelta,
            EVENT_COT_END => Self::ExplicitEnd,
            _ if is_delta => Self::MetadataDelta,
            _ => Self::LegacyFullText,
        }
    }

    fn text_mode(self) -> TextMode {
        match self {
            Self::LegacyFullText => TextMode::FullText,
            _ => TextMode::Fragment,
        }
    }
}

/// Decoded `parts[0]` of a chain-of-thought event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CotPayload {
    pub investigation: String,
    pub metadata: CotMetadata,
}

impl CotPayload {
    /// A part that is not a JSON object is bare investigation text.
    pub fn parse(part: &str) -> Self {
        match serde_json::from_str::<Value>(part) {
            Ok(Value::Object(obj)) => {
                let investigation = match obj.get("investigation") {
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                let sources_involved = match obj.get("sources_involved") {
                    Some(Value::Array(items)) => items.len(),
                    Some(Value::Number(n)) => n.as_u64().unwrap_or_default() as usize,
                    _ => 0,
                };
                Self {
                    investigation,
                    metadata: CotMetadata {
                        description: string_field(&obj, "description"),
                        explanation: string_field(&obj, "explanation"),
                        category: string_field(&obj, "category"),
                        status: string_field(&obj, "status"),
                        sources_involved,
                    },
                }
            }
            _ => Self {
                investigation: part.to_string(),
                metadata: CotMetadata::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CotMetadata {
    pub description: String,
    pub explanation: String,
    pub category: String,
    pub status: String,
    pub sources_involved: usize,
}

fn keep_non_empty(slot: &mut String, incoming: &str) {
    if !incoming.is_empty() {
        *slot = incoming.to_string();
    }
}

impl CotMetadata {
    /// Non-empty incoming values win; empty ones never erase.
    pub fn merge(&mut self, incoming: &CotMetadata) {
        keep_non_empty(&mut self.description, &incoming.description);
        keep_non_empty(&mut self.explanation, &incoming.explanation);
        keep_non_empty(&mut self.category, &incoming.category);
        keep_non_empty(&mut self.status, &incoming.status);
        if incoming.sources_involved > 0 {
            self.sources_involved = incoming.sources_involved;
        }
    }
}

/// `CHAIN_OF_THOUGHT_CATEGORY_LOG_ANALYSIS` -> `Log analysis`.
pub fn clean_category(raw: &str) -> String {
    let name = match raw.rfind(CATEGORY_ENUM_MARKER) {
        Some(idx) => &raw[idx + CATEGORY_ENUM_MARKER.len()..],
        None => raw,
    };
    humanize_enum(name)
}

/// Symbol and word for the known statuses, the raw value for anything else.
pub fn status_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let name = match trimmed.rfind(STATUS_ENUM_MARKER) {
        Some(idx) => &trimmed[idx + STATUS_ENUM_MARKER.len()..],
        None => trimmed,
    };
    let label = match name.to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
        "IN_PROGRESS" => "⋯ In progress".to_string(),
        "DONE" => "✓ Done".to_string(),
        "ERROR" => "✗ Error".to_string(),
        "CANCELLED" | "CANCELED" => "⊘ Cancelled".to_string(),
        _ => trimmed.to_string(),
    };
    Some(label)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundHeader {
    pub step: usize,
    pub category: String,
    pub explanation: String,
    /// Only set when it says something the explanation does not.
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundFooter {
    pub status: Option<String>,
    pub sources: usize,
}

impl RoundFooter {
    pub fn summary(&self) -> String {
        let sources = match self.sources {
            0 => None,
            1 => Some("1 source".to_string()),
            n => Some(format!("{} sources", n)),
        };
        [self.status.clone(), sources]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" · ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CotOutput {
    Header(RoundHeader),
    Text(String),
    Footer(RoundFooter),
}

#[derive(Debug, Default)]
pub struct CotTracker {
    round: Round,
    metadata: CotMetadata,
    open: bool,
    /// Set by `cot_end`; the footer waits for whatever comes next.
    done: bool,
    step: usize,
}

impl CotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn metadata(&self) -> &CotMetadata {
        &self.metadata
    }

    /// Rounds that got a header so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn apply(&mut self, event_type: &str, is_delta: bool, part: &str) -> Vec<CotOutput> {
        let frame = CotFrame::resolve(event_type, is_delta);
        let payload = CotPayload::parse(part);
        let mut out = Vec::new();

        match frame {
            CotFrame::ExplicitStart => {
                self.close_into(&mut out);
                self.open_round();
                self.metadata.merge(&payload.metadata);
                self.emit_header(&mut out);
            }
            CotFrame::ExplicitDelta | CotFrame::MetadataDelta => {
                if !self.open || self.done {
                    self.close_into(&mut out);
                    self.open_round();
                }
                self.metadata.merge(&payload.metadata);
            }
            CotFrame::ExplicitEnd => {
                if !self.open {
                    tracing::debug!("[COT] end marker without an open round");
                    return out;
                }
                self.metadata.merge(&payload.metadata);
                self.done = true;
                return out;
            }
            CotFrame::LegacyFullText => {
                if self.open && self.starts_new_legacy_round(&payload) {
                    tracing::debug!("[COT] legacy round boundary detected");
                    self.close_into(&mut out);
                }
                if !self.open {
                    self.open_round();
                }
                self.metadata.merge(&payload.metadata);
            }
        }

        if let Some(delta) = self.round.absorb(&payload.investigation, frame.text_mode()) {
            self.emit_header(&mut out);
            out.push(CotOutput::Text(delta));
        }
        out
    }

    /// Legacy servers give no boundary signal. A new step is inferred when the
    /// previous one was ended, when the full text is shorter than what was
    /// already printed, or when the step's description or explanation is
    /// replaced by a different non-empty value.
    pub fn starts_new_legacy_round(&self, payload: &CotPayload) -> bool {
        fn replaced(current: &str, incoming: &str) -> bool {
            !current.is_empty() && !incoming.is_empty() && current != incoming
        }

        self.done
            || payload.investigation.len() < self.round.printed_length()
            || replaced(&self.metadata.description, &payload.metadata.description)
            || replaced(&self.metadata.explanation, &payload.metadata.explanation)
    }

    /// Close the open round, if any.
    pub fn close(&mut self) -> Vec<CotOutput> {
        let mut out = Vec::new();
        self.close_into(&mut out);
        out
    }

    fn open_round(&mut self) {
        self.round.reset();
        self.metadata = CotMetadata::default();
        self.open = true;
        self.done = false;
    }

    fn emit_header(&mut self, out: &mut Vec<CotOutput>) {
        if self.round.header_emitted() {
            return;
        }
        self.round.mark_header_emitted();
        self.step += 1;

        let explanation = self.metadata.explanation.clone();
        let description = Some(self.metadata.description.clone())
            .filter(|d| !d.is_empty() && *d != explanation);
        out.push(CotOutput::Header(RoundHeader {
            step: self.step,
            category: clean_category(&self.metadata.category),
            explanation,
            description,
        }));
    }

    fn close_into(&mut self, out: &mut Vec<CotOutput>) {
        if !self.open {
            return;
        }
        if self.round.has_printed() {
            out.push(CotOutput::Footer(RoundFooter {
                status: status_label(&self.metadata.status),
                sources: self.metadata.sources_involved,
            }));
        }
        self.round.reset();
        self.metadata = CotMetadata::default();
        self.open = false;
        self.done = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn part(investigation: &str) -> String {
        json!({ "investigation": investigation }).to_string()
    }

    fn texts(out: &[CotOutput]) -> Vec<String> {
        out.iter()
            .filter_map(|o| match o {
                CotOutput::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn frame_resolution_table() {
        assert_eq!(CotFrame::resolve("cot_start", false), CotFrame::ExplicitStart);
        assert_eq!(CotFrame::resolve("cot_delta", false), CotFrame::ExplicitDelta);
        assert_eq!(CotFrame::resolve("cot_end", true), CotFrame::ExplicitEnd);
        assert_eq!(CotFrame::resolve("message", true), CotFrame::MetadataDelta);
        assert_eq!(CotFrame::resolve("message", false), CotFrame::LegacyFullText);
    }

    #[test]
    fn legacy_growth_prints_single_character_deltas() {
        let mut cot = CotTracker::new();
        let mut printed = Vec::new();
        for full in ["A", "AB", "ABC"] {
            printed.extend(texts(&cot.apply("message", false, &part(full))));
        }
        assert_eq!(printed, vec!["A", "B", "C"]);
        assert_eq!(cot.round().accumulated_text(), "ABC");
    }

    #[test]
    fn header_precedes_first_text_only_once() {
        let mut cot = CotTracker::new();
        let first = cot.apply(
            "message",
            true,
            &json!({"investigation": "x", "category": "CATEGORY_LOG_ANALYSIS", "explanation": "Check logs", "description": "Check logs"}).to_string(),
        );
        assert_eq!(
            first[0],
            CotOutput::Header(RoundHeader {
                step: 1,
                category: "Log analysis".to_string(),
                explanation: "Check logs".to_string(),
                description: None,
            })
        );
        assert_eq!(first[1], CotOutput::Text("x".to_string()));

        let second = cot.apply("message", true, &part("y"));
        assert_eq!(second, vec![CotOutput::Text("y".to_string())]);
    }

    #[test]
    fn cot_start_emits_header_immediately_and_closes_previous() {
        let mut cot = CotTracker::new();
        cot.apply("cot_delta", false, &part("first"));
        let out = cot.apply("cot_start", false, &json!({"explanation": "Step two"}).to_string());
        assert!(matches!(out[0], CotOutput::Footer(_)));
        match &out[1] {
            CotOutput::Header(h) => {
                assert_eq!(h.step, 2);
                assert_eq!(h.explanation, "Step two");
            }
            other => panic!("expected header, got {:?}", other),
        }
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn cot_end_defers_footer_until_next_round() {
        let mut cot = CotTracker::new();
        cot.apply("cot_delta", false, &part("one"));
        let end = cot.apply("cot_end", false, &json!({"status": "DONE"}).to_string());
        assert!(end.is_empty());
        assert!(cot.is_done());

        let next = cot.apply("cot_delta", false, &part("two"));
        assert_eq!(
            next[0],
            CotOutput::Footer(RoundFooter {
                status: Some("✓ Done".to_string()),
                sources: 0,
            })
        );
        assert!(matches!(next[1], CotOutput::Header(RoundHeader { step: 2, .. })));
        assert_eq!(next[2], CotOutput::Text("two".to_string()));
    }

    #[test]
    fn legacy_shrink_starts_new_round() {
        let mut cot = CotTracker::new();
        cot.apply("message", false, &part("long first step"));
        let out = cot.apply("message", false, &part("new"));
        assert!(matches!(out[0], CotOutput::Footer(_)));
        assert!(matches!(out[1], CotOutput::Header(RoundHeader { step: 2, .. })));
        assert_eq!(out[2], CotOutput::Text("new".to_string()));
        assert_eq!(cot.round().printed_length(), 3);
    }

    #[test]
    fn legacy_explanation_change_starts_new_round() {
        let mut cot = CotTracker::new();
        cot.apply(
            "message",
            false,
            &json!({"investigation": "a", "explanation": "one"}).to_string(),
        );
        // Empty metadata does not count as a change.
        let same = cot.apply("message", false, &json!({"investigation": "ab"}).to_string());
        assert_eq!(same, vec![CotOutput::Text("b".to_string())]);

        let out = cot.apply(
            "message",
            false,
            &json!({"investigation": "abc-longer", "explanation": "two"}).to_string(),
        );
        assert!(matches!(out[0], CotOutput::Footer(_)));
        assert_eq!(texts(&out), vec!["abc-longer"]);
    }

    #[test]
    fn legacy_text_after_cot_end_starts_new_round() {
        let mut cot = CotTracker::new();
        cot.apply("cot_delta", false, &part("one"));
        assert!(cot.apply("cot_end", false, "{}").is_empty());

        let out = cot.apply("message", false, &part("one more"));
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], CotOutput::Footer(_)));
        assert!(matches!(out[1], CotOutput::Header(RoundHeader { step: 2, .. })));
        assert_eq!(out[2], CotOutput::Text("one more".to_string()));
        assert!(!cot.is_done());
    }

    #[test]
    fn legacy_description_change_starts_new_round() {
        let mut cot = CotTracker::new();
        cot.apply(
            "message",
            false,
            &json!({"investigation": "a", "description": "d1"}).to_string(),
        );
        let out = cot.apply(
            "message",
            false,
            &json!({"investigation": "a longer", "description": "d2"}).to_string(),
        );
        assert!(matches!(out[0], CotOutput::Footer(_)));
        match &out[1] {
            CotOutput::Header(h) => {
                assert_eq!(h.step, 2);
                assert_eq!(h.description.as_deref(), Some("d2"));
            }
            other => panic!("expected header, got {:?}", other),
        }
        assert_eq!(texts(&out), vec!["a longer"]);
    }

    #[test]
    fn legacy_metadata_only_event_closes_round_without_its_status() {
        let mut cot = CotTracker::new();
        cot.apply("message", false, &part("abc"));
        let out = cot.apply(
            "message",
            false,
            &json!({"investigation": "", "status": "DONE"}).to_string(),
        );
        assert_eq!(
            out,
            vec![CotOutput::Footer(RoundFooter {
                status: None,
                sources: 0,
            })]
        );
        assert!(cot.is_open());
        assert!(!cot.round().has_printed());
    }

    #[test]
    fn metadata_does_not_leak_into_next_round() {
        let mut cot = CotTracker::new();
        cot.apply(
            "cot_delta",
            false,
            &json!({"investigation": "a", "status": "ERROR", "sources_involved": ["x", "y"]}).to_string(),
        );
        let out = cot.close();
        assert_eq!(
            out,
            vec![CotOutput::Footer(RoundFooter {
                status: Some("✗ Error".to_string()),
                sources: 2,
            })]
        );
        cot.apply("cot_delta", false, &part("b"));
        assert_eq!(cot.metadata(), &CotMetadata::default());
    }

    #[test]
    fn footer_skipped_when_nothing_printed() {
        let mut cot = CotTracker::new();
        let start = cot.apply("cot_start", false, "{}");
        assert!(matches!(start[0], CotOutput::Header(_)));
        assert!(cot.close().is_empty());
        assert!(!cot.is_open());
    }

    #[test]
    fn bare_text_part_is_investigation() {
        let mut cot = CotTracker::new();
        let out = cot.apply("cot_delta", false, "plain words");
        assert_eq!(texts(&out), vec!["plain words"]);
    }

    #[test]
    fn status_vocabulary() {
        assert_eq!(status_label("STATUS_IN_PROGRESS").as_deref(), Some("⋯ In progress"));
        assert_eq!(status_label("done").as_deref(), Some("✓ Done"));
        assert_eq!(status_label("canceled").as_deref(), Some("⊘ Cancelled"));
        assert_eq!(status_label("PAUSED").as_deref(), Some("PAUSED"));
        assert_eq!(status_label(""), None);
    }

    #[test]
    fn footer_summary_joins_status_and_sources() {
        let footer = RoundFooter {
            status: Some("✓ Done".to_string()),
            sources: 3,
        };
        assert_eq!(footer.summary(), "✓ Done · 3 sources");
        let bare = RoundFooter {
            status: None,
            sources: 1,
        };
        assert_eq!(bare.summary(), "1 source");
    }
}
