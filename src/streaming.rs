use crate::chat::{ChatOutput, ChatPrinter};
use crate::console::Console;
use crate::cot::{CotOutput, CotTracker};
use crate::envelope::decode_frame;
use crate::logging::StreamMetric;
use crate::progress::{ProgressTracker, ProgressUpdate};
use crate::sources::SourceTracker;
use crate::sse::SseReader;
use crate::types::{ContentType, Event, Result, StreamOutcome};
use std::collections::HashSet;
use std::io::Write;
use tokio::io::AsyncRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Routes decoded events to the trackers and renders what they produce.
///
/// Single-threaded by construction: it owns the console, and every event is
/// fully rendered before `handle_event` returns.
pub struct StreamHandler<W: Write> {
    console: Console<W>,
    progress: ProgressTracker,
    sources: SourceTracker,
    cot: CotTracker,
    chat: ChatPrinter,
    session_uuid: Option<String>,
    session_name: Option<String>,
    listed_items: HashSet<String>,
    summary_shown: bool,
    finished: bool,
    metrics: StreamMetric,
}

impl<W: Write> StreamHandler<W> {
    pub fn new(console: Console<W>) -> Self {
        Self {
            console,
            progress: ProgressTracker::new(),
            sources: SourceTracker::new(),
            cot: CotTracker::new(),
            chat: ChatPrinter::new(),
            session_uuid: None,
            session_name: None,
            listed_items: HashSet::new(),
            summary_shown: false,
            finished: false,
            metrics: StreamMetric::new(),
        }
    }

    pub fn final_answer(&self) -> &str {
        self.chat.final_answer()
    }

    pub fn session_uuid(&self) -> Option<&str> {
        self.session_uuid.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    pub fn metrics(&self) -> &StreamMetric {
        &self.metrics
    }

    pub fn handle_event(&mut self, event: Event) -> Result<Flow> {
        if self.finished {
            tracing::debug!("[DISPATCH] event after stream end ignored");
            return Ok(Flow::Finished);
        }
        self.metrics.record_event(&event);

        if let Some(uuid) = event.session_uuid.as_deref().filter(|u| !u.is_empty()) {
            if self.session_uuid.as_deref() != Some(uuid) {
                tracing::debug!("[DISPATCH] session {}", uuid);
                self.session_uuid = Some(uuid.to_string());
            }
        }

        self.close_blocks_for(&event.content_type)?;

        match &event.content_type {
            ContentType::ProgressStatus => self.on_progress(event.first_part())?,
            ContentType::Sources => self.on_sources(&event.parts)?,
            ContentType::ChainOfThought => {
                let out = self
                    .cot
                    .apply(&event.event_type, event.is_delta(), event.first_part());
                self.render_cot(out)?;
            }
            ContentType::ChatResponse => {
                let out = self.chat.apply(event.is_delta(), event.first_part());
                self.render_chat(out)?;
            }
            ContentType::SessionName => self.on_session_name(event.first_part())?,
            ContentType::FollowUpSuggestions => {
                self.on_list("Suggested follow-ups", &event.parts)?
            }
            ContentType::AlternateQuestions => self.on_list("Related questions", &event.parts)?,
            ContentType::ExecutionTime => {
                let elapsed = format_execution_time(event.first_part());
                if !elapsed.is_empty() {
                    self.console.execution_time(&elapsed)?;
                }
            }
            ContentType::ErrorMessage => {
                let message = event.first_part().trim();
                if !message.is_empty() {
                    tracing::warn!("[DISPATCH] server reported error: {}", message);
                    self.console.error(message)?;
                }
            }
            ContentType::ShiftFocusToSummary => {
                if !self.summary_shown {
                    self.summary_shown = true;
                    self.console.summary_divider()?;
                }
            }
            ContentType::Other(raw) => {
                tracing::trace!("[DISPATCH] ignoring content type {}", raw);
            }
            ContentType::Unspecified => {}
        }

        if event.end_turn {
            self.finish()?;
            return Ok(Flow::Finished);
        }
        Ok(Flow::Continue)
    }

    /// Close open blocks and flush everything. Safe to call more than once.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let out = self.cot.close();
        self.render_cot(out)?;
        if let Some(out) = self.chat.close() {
            self.render_chat(vec![out])?;
        }
        self.console.finish()?;
        self.finished = true;
        self.metrics.log_summary(self.session_uuid.as_deref());
        Ok(())
    }

    /// Best effort cleanup after a fatal error: leave no activity line behind.
    pub fn abort(&mut self) {
        let _ = self.console.clear_activity();
        let _ = self.console.finish();
    }

    /// Progress and sources render between the lines of an open block; any
    /// other content type ends the block it does not belong to.
    fn close_blocks_for(&mut self, content_type: &ContentType) -> Result<()> {
        if content_type.is_ambient() {
            return Ok(());
        }
        if *content_type != ContentType::ChainOfThought && self.cot.is_open() {
            let out = self.cot.close();
            self.render_cot(out)?;
        }
        if *content_type != ContentType::ChatResponse {
            if let Some(out) = self.chat.close() {
                self.render_chat(vec![out])?;
            }
        }
        Ok(())
    }

    fn on_progress(&mut self, text: &str) -> Result<()> {
        match self.progress.observe(text) {
            ProgressUpdate::Milestone(line) => {
                self.metrics.progress_lines += 1;
                self.console.milestone(&line)?;
            }
            ProgressUpdate::Activity(line) => self.console.activity(&line)?,
            ProgressUpdate::Suppressed => {}
        }
        Ok(())
    }

    fn on_sources(&mut self, parts: &[String]) -> Result<()> {
        let batch = self.sources.observe(parts);
        if !batch.lines.is_empty() {
            self.metrics.source_lines += batch.lines.len();
            self.console.sources(&batch)?;
        }
        Ok(())
    }

    fn on_session_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || self.session_name.as_deref() == Some(name) {
            return Ok(());
        }
        self.session_name = Some(name.to_string());
        self.console.session_name(name)?;
        Ok(())
    }

    fn on_list(&mut self, title: &str, parts: &[String]) -> Result<()> {
        let mut items = Vec::new();
        for part in parts {
            let item = part.trim();
            if item.is_empty() {
                continue;
            }
            if self.listed_items.insert(format!("{}\u{0}{}", title, item)) {
                items.push(item.to_string());
            }
        }
        if !items.is_empty() {
            self.console.titled_list(title, &items)?;
        }
        Ok(())
    }

    fn render_cot(&mut self, out: Vec<CotOutput>) -> Result<()> {
        for item in out {
            match item {
                CotOutput::Header(header) => {
                    self.metrics.cot_rounds += 1;
                    self.console.round_header(&header)?;
                }
                CotOutput::Text(fragment) => self.console.block_text(&fragment)?,
                CotOutput::Footer(footer) => self.console.round_footer(&footer)?,
            }
        }
        Ok(())
    }

    fn render_chat(&mut self, out: Vec<ChatOutput>) -> Result<()> {
        for item in out {
            match item {
                ChatOutput::Open => self.console.answer_header()?,
                ChatOutput::Text(fragment) => {
                    self.metrics.chat_bytes += fragment.len();
                    self.console.block_text(&fragment)?;
                }
                ChatOutput::Close => self.console.answer_footer()?,
            }
        }
        Ok(())
    }
}

/// Seconds as `Xm Ys` / `Ys`; anything that is not a number passes through.
pub fn format_execution_time(raw: &str) -> String {
    let trimmed = raw.trim();
    let numeric = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();
    match numeric.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => {
            let total = secs.round() as u64;
            if total >= 60 {
                format!("{}m {}s", total / 60, total % 60)
            } else if secs < 10.0 && secs.fract() != 0.0 {
                format!("{:.1}s", secs)
            } else {
                format!("{}s", total)
            }
        }
        _ => trimmed.to_string(),
    }
}

/// Read SSE from `reader` and render it until `end_turn` or until the byte
/// stream closes. Closing without `end_turn` still finalizes open rounds.
pub async fn stream_to_terminal<R, W>(
    reader: R,
    handler: &mut StreamHandler<W>,
) -> Result<StreamOutcome>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut frames = SseReader::new(reader);

    loop {
        let frame = match frames.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                handler.abort();
                return Err(e);
            }
        };
        handler.metrics.record_frame();

        let Some(event) = decode_frame(&frame) else {
            handler.metrics.record_dropped();
            continue;
        };

        if handler.handle_event(event)? == Flow::Finished {
            tracing::debug!("[STREAM] end_turn after {} lines", frames.lines_read());
            return Ok(StreamOutcome::EndTurn);
        }
    }

    tracing::debug!(
        "[STREAM] closed without end_turn after {} lines",
        frames.lines_read()
    );
    handler.finish()?;
    Ok(StreamOutcome::Closed)
}
