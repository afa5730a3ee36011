//! Line-at-a-time Markdown to styled terminal text.
//!
//! Only complete lines are rendered. A trailing partial line waits in the
//! buffer for the next chunk, so inline markers and escape sequences are never
//! split, and feeding a text in one piece or many produces the same output.

use crate::constants::RULE_WIDTH;
use colored::*;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref CODE_SPAN: Regex = Regex::new(r"`([^`]+)`").expect("Invalid code span regex");
    static ref LINK: Regex =
        Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("Invalid link regex");
    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").expect("Invalid bold regex");
    static ref ITALIC: Regex = Regex::new(r"\*([^*\s][^*]*)\*").expect("Invalid italic regex");
    static ref BULLET: Regex = Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("Invalid bullet regex");
    static ref NUMBERED: Regex =
        Regex::new(r"^(\s*)(\d+)[.)]\s+(.*)$").expect("Invalid numbered regex");
    static ref TABLE_SEPARATOR_CELL: Regex =
        Regex::new(r"^:?-{1,}:?$").expect("Invalid table separator regex");
}

#[derive(Debug, Default)]
pub struct MarkdownRenderer {
    pending: String,
    in_code_block: bool,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_code_block(&self) -> bool {
        self.in_code_block
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Render every line completed by `chunk`.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            lines.push(self.render_line(line));
        }
        lines
    }

    /// End of the block: render the partial line, if any, and reset.
    pub fn flush(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            lines.push(self.render_line(line.trim_end_matches('\r')));
        }
        self.in_code_block = false;
        lines
    }

    fn render_line(&mut self, line: &str) -> String {
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            let opening = !self.in_code_block;
            self.in_code_block = opening;
            let lang = trimmed.trim_start_matches('`').trim();
            return if opening && !lang.is_empty() {
                format!("{} {}", "───".dimmed(), lang.dimmed())
            } else {
                "───".dimmed().to_string()
            };
        }

        if self.in_code_block {
            return format!("  {}", line.green());
        }

        if is_horizontal_rule(trimmed) {
            return "─".repeat(RULE_WIDTH).dimmed().to_string();
        }

        if let Some((level, text)) = heading(trimmed) {
            let plain = strip_inline(text);
            return match level {
                1 => plain.bold().underline().cyan().to_string(),
                2 => plain.bold().cyan().to_string(),
                3 => plain.bold().to_string(),
                _ => plain.bold().italic().to_string(),
            };
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            return format!("{} {}", "│".dimmed(), render_inline(rest));
        }

        if trimmed.starts_with('|') {
            return render_table_row(trimmed);
        }

        if let Some(caps) = BULLET.captures(line) {
            return format!("{}{} {}", &caps[1], "•".cyan(), render_inline(&caps[2]));
        }

        if let Some(caps) = NUMBERED.captures(line) {
            let number = format!("{}.", &caps[2]);
            return format!("{}{} {}", &caps[1], number.bold(), render_inline(&caps[3]));
        }

        render_inline(line)
    }
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.chars().all(|c| c == *marker))
}

fn heading(trimmed: &str) -> Option<(usize, &str)> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=4).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    rest.strip_prefix(' ').map(|text| (level, text.trim()))
}

fn render_table_row(trimmed: &str) -> String {
    let inner = trimmed.trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<&str> = inner.split('|').map(str::trim).collect();

    let is_separator = !cells.is_empty()
        && cells
            .iter()
            .all(|cell| TABLE_SEPARATOR_CELL.is_match(cell));
    if is_separator {
        return cells
            .iter()
            .map(|cell| "─".repeat(cell.chars().count().max(3)))
            .collect::<Vec<_>>()
            .join("─┼─")
            .dimmed()
            .to_string();
    }

    let divider = format!(" {} ", "│".dimmed());
    cells
        .iter()
        .map(|cell| render_inline(cell))
        .collect::<Vec<_>>()
        .join(&divider)
}

/// Inline styling. Code spans are emitted as-is, the rest gets links, bold
/// and italic.
pub fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in CODE_SPAN.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&style_prose(&text[last..whole.start()]));
        out.push_str(&caps[1].yellow().to_string());
        last = whole.end();
    }
    out.push_str(&style_prose(&text[last..]));
    out
}

fn style_prose(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let linked = LINK.replace_all(text, |caps: &Captures| {
        format!(
            "{} {}",
            caps[1].underline().blue(),
            format!("({})", &caps[2]).dimmed()
        )
    });
    let bolded = BOLD.replace_all(&linked, |caps: &Captures| caps[1].bold().to_string());
    ITALIC
        .replace_all(&bolded, |caps: &Captures| caps[1].italic().to_string())
        .into_owned()
}

/// Marker-free text, for places that style the whole line themselves.
pub fn strip_inline(text: &str) -> String {
    let no_code = CODE_SPAN.replace_all(text, "$1");
    let no_links = LINK.replace_all(&no_code, "$1");
    let no_bold = BOLD.replace_all(&no_links, "$1");
    ITALIC.replace_all(&no_bold, "$1").into_owned()
}
