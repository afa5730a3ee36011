//! SSE line grammar.
//!
//! [`FrameParser`] is the pure line state machine; [`SseReader`] drives it from
//! any `AsyncRead` through a length-capped `LinesCodec`.

use crate::constants::{
    DEFAULT_EVENT_TYPE, IGNORED_FIELD_PREFIXES, MAX_LINE_BYTES, PAYLOAD_SENTINELS,
};
use crate::types::{Result, SleuthError};
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// One `(event_type, data)` pair as framed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event_type: String,
    pub data: String,
}

#[derive(Debug)]
pub struct FrameParser {
    event_type: String,
    data: Option<String>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self {
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            data: None,
        }
    }
}

pub fn is_sentinel(payload: &str) -> bool {
    let trimmed = payload.trim();
    PAYLOAD_SENTINELS.contains(&trimmed)
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns a frame when the line
    /// closes a block that carried data.
    pub fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            let frame = self.take_pending();
            self.event_type = DEFAULT_EVENT_TYPE.to_string();
            return frame;
        }

        if let Some(rest) = line.strip_prefix("event:") {
            let event_type = rest.trim();
            self.event_type = if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type.to_string()
            };
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let payload = rest.strip_prefix(' ').unwrap_or(rest);
            if is_sentinel(payload) {
                tracing::trace!("[SSE] sentinel payload skipped: {}", payload.trim());
                return None;
            }
            match self.data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(payload);
                }
                None => self.data = Some(payload.to_string()),
            }
            return None;
        }

        if !IGNORED_FIELD_PREFIXES.iter().any(|p| line.starts_with(p)) {
            tracing::trace!(
                "[SSE] unrecognised line: {}",
                crate::str_utils::prefix_chars(line, 80)
            );
        }
        None
    }

    /// End of input. A block that was never closed by a blank line still
    /// counts.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let frame = self.take_pending();
        self.event_type = DEFAULT_EVENT_TYPE.to_string();
        frame
    }

    fn take_pending(&mut self) -> Option<SseFrame> {
        self.data.take().map(|data| SseFrame {
            event_type: self.event_type.clone(),
            data,
        })
    }
}

pub struct SseReader<R> {
    lines: FramedRead<R, LinesCodec>,
    parser: FrameParser,
    lines_read: usize,
    exhausted: bool,
}

impl<R> SseReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES)),
            parser: FrameParser::new(),
            lines_read: 0,
            exhausted: false,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Next framed payload, `Ok(None)` once the byte stream has closed.
    /// Oversized lines and read failures are fatal.
    pub async fn next_frame(&mut self) -> Result<Option<SseFrame>> {
        if self.exhausted {
            return Ok(None);
        }

        while let Some(line_result) = self.lines.next().await {
            let line = line_result.map_err(line_error)?;
            self.lines_read += 1;
            if let Some(frame) = self.parser.push_line(&line) {
                return Ok(Some(frame));
            }
        }

        self.exhausted = true;
        tracing::debug!("[SSE] byte stream closed after {} lines", self.lines_read);
        Ok(self.parser.finish())
    }
}

fn line_error(e: LinesCodecError) -> SleuthError {
    tracing::error!("[SSE] line read failed: {}", e);
    match e {
        LinesCodecError::Io(io) => SleuthError::Io(io),
        LinesCodecError::MaxLineLengthExceeded => SleuthError::LineTooLong {
            limit: MAX_LINE_BYTES,
        },
    }
}
