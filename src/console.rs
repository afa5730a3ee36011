use crate::constants::ACTIVITY_FRAMES;
use crate::cot::{RoundFooter, RoundHeader};
use crate::markdown::MarkdownRenderer;
use crate::sources::SourceBatch;
use colored::*;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};

/// The terminal side of the renderer.
///
/// Permanent output is always whole lines. The activity line is the only
/// thing ever overwritten in place, and it is cleared before anything
/// permanent goes out.
pub struct Console<W: Write> {
    out: W,
    markdown: MarkdownRenderer,
    interactive: bool,
    activity_line_active: bool,
    activity_frame: usize,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            markdown: MarkdownRenderer::new(),
            interactive,
            activity_line_active: false,
            activity_frame: 0,
        }
    }

    /// Non-interactive console, e.g. for piped output and tests.
    pub fn plain(out: W) -> Self {
        Self::new(out, false)
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn activity_line_active(&self) -> bool {
        self.activity_line_active
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.clear_activity()?;
        writeln!(self.out, "{}", text)
    }

    pub fn clear_activity(&mut self) -> io::Result<()> {
        if self.activity_line_active {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            self.activity_line_active = false;
        }
        Ok(())
    }

    /// Overwrite the activity line. Skipped when output is not a terminal.
    pub fn activity(&mut self, text: &str) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        let frame = ACTIVITY_FRAMES[self.activity_frame % ACTIVITY_FRAMES.len()];
        self.activity_frame = self.activity_frame.wrapping_add(1);
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(self.out, "{} {}", frame.to_string().cyan(), text.dimmed())?;
        self.out.flush()?;
        self.activity_line_active = true;
        Ok(())
    }

    pub fn milestone(&mut self, text: &str) -> io::Result<()> {
        self.line(&format!("{} {}", "▸".cyan(), text))
    }

    pub fn sources(&mut self, batch: &SourceBatch) -> io::Result<()> {
        if batch.show_header {
            self.line(&"Sources".bold().to_string())?;
        }
        for label in &batch.lines {
            self.line(&format!("  {} {}", "•".dimmed(), label.dimmed()))?;
        }
        Ok(())
    }

    pub fn round_header(&mut self, header: &RoundHeader) -> io::Result<()> {
        self.line("")?;
        let step = format!("Step {}", header.step).bold().magenta().to_string();
        let title = match (header.category.is_empty(), header.explanation.is_empty()) {
            (true, true) => step,
            (false, true) => format!("{} · {}", step, header.category.cyan()),
            (true, false) => format!("{} {}", step, header.explanation.bold()),
            (false, false) => format!(
                "{} · {} {}",
                step,
                header.category.cyan(),
                header.explanation.bold()
            ),
        };
        self.line(&title)?;
        if let Some(description) = &header.description {
            self.line(&description.dimmed().italic().to_string())?;
        }
        Ok(())
    }

    /// Markdown text for whichever block is open.
    pub fn block_text(&mut self, fragment: &str) -> io::Result<()> {
        for rendered in self.markdown.push(fragment) {
            self.line(&rendered)?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> io::Result<()> {
        for rendered in self.markdown.flush() {
            self.line(&rendered)?;
        }
        Ok(())
    }

    pub fn round_footer(&mut self, footer: &RoundFooter) -> io::Result<()> {
        self.flush_block()?;
        let summary = footer.summary();
        if summary.is_empty() {
            self.line(&"└".dimmed().to_string())
        } else {
            self.line(&format!("{} {}", "└".dimmed(), summary.dimmed()))
        }
    }

    pub fn answer_header(&mut self) -> io::Result<()> {
        self.line("")?;
        self.line(&"Answer".bold().green().to_string())
    }

    pub fn answer_footer(&mut self) -> io::Result<()> {
        self.flush_block()?;
        self.line(&"───".dimmed().to_string())
    }

    pub fn session_name(&mut self, name: &str) -> io::Result<()> {
        self.line(&format!("{} {}", "Session:".dimmed(), name.bold()))
    }

    pub fn titled_list(&mut self, title: &str, items: &[String]) -> io::Result<()> {
        self.line("")?;
        self.line(&title.bold().to_string())?;
        for item in items {
            self.line(&format!("  {} {}", "•".cyan(), item))?;
        }
        Ok(())
    }

    pub fn execution_time(&mut self, elapsed: &str) -> io::Result<()> {
        self.line(&format!("Completed in {}", elapsed).dimmed().to_string())
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        self.line(&format!("{} {}", "✗".red().bold(), message.red()))
    }

    pub fn summary_divider(&mut self) -> io::Result<()> {
        self.line("")?;
        self.line(&"── Summary ──".bold().to_string())
    }

    /// Stream end: nothing transient left on screen, nothing buffered.
    pub fn finish(&mut self) -> io::Result<()> {
        self.clear_activity()?;
        self.flush_block()?;
        self.out.flush()
    }
}
