//! Where rendered lines go, and how wide they may be.

use colview_markup::MarkupText;

use crate::error::Result;

/// Accepts rendered lines one at a time.
pub trait OutputSink {
    fn write_line(&mut self, line: &MarkupText) -> Result<()>;
}

/// Writes to stdout, with color when the process-wide color flag is on.
#[derive(Debug, Clone)]
pub struct TerminalSink {
    term: console::Term,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self {
            term: console::Term::stdout(),
        }
    }

    pub fn stderr() -> Self {
        Self {
            term: console::Term::stderr(),
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl OutputSink for TerminalSink {
    fn write_line(&mut self, line: &MarkupText) -> Result<()> {
        self.term
            .write_line(line.render(console::colors_enabled()))?;
        Ok(())
    }
}

/// Collects lines in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Vec<MarkupText>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines without escape sequences.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| l.render(false).to_string())
            .collect()
    }

    /// Lines with escape sequences.
    pub fn colored_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| l.render(true).to_string())
            .collect()
    }

    pub fn markup(&self) -> &[MarkupText] {
        &self.lines
    }

    /// All lines joined with newlines, without escape sequences.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl OutputSink for BufferSink {
    fn write_line(&mut self, line: &MarkupText) -> Result<()> {
        self.lines.push(line.to_unfrozen());
        Ok(())
    }
}

/// Supplies the current output width. The answer may change between calls.
pub trait WidthProvider {
    fn width(&self) -> Option<usize>;
}

/// A constant width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidth(pub usize);

impl WidthProvider for FixedWidth {
    fn width(&self) -> Option<usize> {
        Some(self.0)
    }
}

/// The width of the attached terminal, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalWidth;

impl WidthProvider for TerminalWidth {
    fn width(&self) -> Option<usize> {
        terminal_size::terminal_size().map(|(w, _)| w.0 as usize)
    }
}
