use crate::str_utils::tail_from;

/// How a text payload relates to what the round already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// The payload is new text to append.
    Fragment,
    /// The payload is the whole text so far.
    FullText,
}

/// Append-only text block with a print cursor.
///
/// `printed_length` counts bytes of `accumulated_text` already handed out and
/// never exceeds its length. Every fragment returned by [`Round::absorb`] is a
/// slice of `accumulated_text` starting at the old cursor, so concatenating
/// them reproduces the text.
#[derive(Debug, Default, Clone)]
pub struct Round {
    accumulated_text: String,
    printed_length: usize,
    header_emitted: bool,
}

impl Round {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn printed_length(&self) -> usize {
        self.printed_length
    }

    pub fn has_printed(&self) -> bool {
        self.printed_length > 0
    }

    pub fn header_emitted(&self) -> bool {
        self.header_emitted
    }

    pub fn mark_header_emitted(&mut self) {
        self.header_emitted = true;
    }

    /// Fold `text` into the round and return the unprinted suffix, if any.
    ///
    /// A full text shorter than what was already printed cannot be applied
    /// without retracting output; it is ignored and the caller decides
    /// whether that means a new round.
    pub fn absorb(&mut self, text: &str, mode: TextMode) -> Option<String> {
        match mode {
            TextMode::Fragment => self.accumulated_text.push_str(text),
            TextMode::FullText => {
                if text.len() < self.printed_length {
                    tracing::debug!(
                        "[ROUND] full text shrank ({} < {} printed), ignoring",
                        text.len(),
                        self.printed_length
                    );
                    return None;
                }
                if !text.starts_with(self.printed_prefix()) {
                    tracing::debug!("[ROUND] full text diverged from printed prefix");
                }
                self.accumulated_text.clear();
                self.accumulated_text.push_str(text);
            }
        }

        let delta = tail_from(&self.accumulated_text, self.printed_length).to_string();
        self.printed_length = self.accumulated_text.len();
        if delta.is_empty() {
            None
        } else {
            Some(delta)
        }
    }

    fn printed_prefix(&self) -> &str {
        match self.accumulated_text.get(..self.printed_length) {
            Some(prefix) => prefix,
            None => "",
        }
    }

    pub fn reset(&mut self) {
        self.accumulated_text.clear();
        self.printed_length = 0;
        self.header_emitted = false;
    }
}
