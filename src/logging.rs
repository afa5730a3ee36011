use crate::types::{ContentType, Event};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic;
use tracing::{error, info};

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(s), _) => *s,
        (None, Some(s)) => s.as_str(),
        (None, None) => "<non-string panic payload>",
    }
}

/// Log panics through tracing, then hand over to the previous hook.
pub fn setup_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = match info.location() {
            Some(l) => format!("{}:{}", l.file(), l.line()),
            None => "?".to_string(),
        };
        error!(
            target: "panic",
            location = %location,
            backtrace = %std::backtrace::Backtrace::capture(),
            "[PANIC] {}",
            panic_text(info.payload())
        );
        previous(info);
    }));
}

fn content_label(content_type: &ContentType) -> String {
    match content_type {
        ContentType::Other(raw) => raw.clone(),
        other => format!("{:?}", other),
    }
}

/// Per-stream counters, logged once when the stream ends.
pub struct StreamMetric {
    pub started_at: chrono::DateTime<chrono::Local>,
    pub frames: usize,
    pub events: usize,
    pub dropped_payloads: usize,
    pub cot_rounds: usize,
    pub chat_bytes: usize,
    pub progress_lines: usize,
    pub source_lines: usize,
    pub by_content_type: BTreeMap<String, usize>,
}

impl Default for StreamMetric {
    fn default() -> Self {
        Self {
            started_at: chrono::Local::now(),
            frames: 0,
            events: 0,
            dropped_payloads: 0,
            cot_rounds: 0,
            chat_bytes: 0,
            progress_lines: 0,
            source_lines: 0,
            by_content_type: BTreeMap::new(),
        }
    }
}

impl StreamMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped_payloads += 1;
    }

    pub fn record_event(&mut self, event: &Event) {
        self.events += 1;
        *self
            .by_content_type
            .entry(content_label(&event.content_type))
            .or_default() += 1;
    }

    pub fn log_summary(&self, session_uuid: Option<&str>) {
        let elapsed_ms = (chrono::Local::now() - self.started_at).num_milliseconds();
        let breakdown = self
            .by_content_type
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        info!(
            target: "stream_summary",
            "[STREAM END] Session: {} | Frames: {} | Events: {} ({}) | Dropped: {} | Rounds: {} | Answer: {} bytes | Progress: {} | Sources: {} | {} ms",
            session_uuid.unwrap_or("unknown"),
            self.frames,
            self.events,
            breakdown,
            self.dropped_payloads,
            self.cot_rounds,
            self.chat_bytes,
            self.progress_lines,
            self.source_lines,
            elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_text() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        let borrowed: Box<dyn Any + Send> = Box::new("bang");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_text(owned.as_ref()), "boom");
        assert_eq!(panic_text(borrowed.as_ref()), "bang");
        assert_eq!(panic_text(other.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn counts_events_by_content_type() {
        let mut metric = StreamMetric::new();
        let mut event = Event {
            content_type: ContentType::ChatResponse,
            ..Event::default()
        };
        metric.record_event(&event);
        metric.record_event(&event);
        event.content_type = ContentType::Other("WIDGET".to_string());
        metric.record_event(&event);

        assert_eq!(metric.events, 3);
        assert_eq!(metric.by_content_type.get("ChatResponse"), Some(&2));
        assert_eq!(metric.by_content_type.get("WIDGET"), Some(&1));
    }
}
