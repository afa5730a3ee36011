use crate::round::{Round, TextMode};
use crate::str_utils::strip_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutput {
    Open,
    Text(String),
    Close,
}

/// The answer block. One round per stream: closing it only ends the framing,
/// the cursor keeps going if more answer text shows up afterwards.
#[derive(Debug, Default)]
pub struct ChatPrinter {
    round: Round,
    open: bool,
}

impl ChatPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Everything received so far, after HTML cleanup.
    pub fn final_answer(&self) -> &str {
        self.round.accumulated_text()
    }

    pub fn printed_length(&self) -> usize {
        self.round.printed_length()
    }

    /// Cleanup happens before the cursor moves, so the cursor counts cleaned
    /// bytes and never raw wire bytes.
    pub fn apply(&mut self, is_delta: bool, part: &str) -> Vec<ChatOutput> {
        let cleaned = strip_html(part);
        let mode = if is_delta {
            TextMode::Fragment
        } else {
            TextMode::FullText
        };

        let mut out = Vec::new();
        if let Some(delta) = self.round.absorb(&cleaned, mode) {
            if !self.open {
                self.open = true;
                out.push(ChatOutput::Open);
            }
            out.push(ChatOutput::Text(delta));
        }
        out
    }

    pub fn close(&mut self) -> Option<ChatOutput> {
        if !self.open {
            return None;
        }
        self.open = false;
        Some(ChatOutput::Close)
    }
}
