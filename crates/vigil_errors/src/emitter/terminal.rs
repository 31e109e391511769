//! Terminal Emitter
//!
//! Human-readable report output with optional ANSI color support.

use std::io::{self, Write};

use vigil_context::ThreadId;

use crate::completer::UNKNOWN_NAME;
use crate::{ErrorReport, ErrorSummary, FrameLine, UsedSuppression};

use super::ReportSink;

/// ANSI color codes for terminal output.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;33m"; // Bold yellow
    pub const HELP: &str = "\x1b[1;32m"; // Bold green
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMode {
    /// Automatically detect based on terminal capabilities.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

impl ColorMode {
    /// Resolve to a boolean based on terminal detection.
    ///
    /// For `Auto` mode, `is_tty` determines whether colors should be used.
    /// This parameter is ignored for `Always` and `Never` modes.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Terminal emitter with optional color support.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    /// Create a new terminal emitter with explicit color mode.
    ///
    /// # Arguments
    ///
    /// * `writer` - The output writer
    /// * `mode` - Color mode selection
    /// * `is_tty` - Whether output is a TTY (used for `ColorMode::Auto`)
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Write text with optional ANSI color codes.
    fn write_colored(&mut self, text: &str, color: &str) {
        if self.colors {
            let _ = write!(self.writer, "{color}{text}{}", colors::RESET);
        } else {
            let _ = write!(self.writer, "{text}");
        }
    }

    fn write_frame(&mut self, index: usize, frame: &FrameLine) {
        let marker = if index == 0 { "at" } else { "by" };
        let function = frame.function.as_deref().unwrap_or(UNKNOWN_NAME);
        let _ = write!(self.writer, "   {marker} {}: {function}", frame.addr);
        if let Some(object) = &frame.object {
            let _ = write!(self.writer, " (in {object})");
        }
        let _ = writeln!(self.writer);
    }
}

impl TerminalEmitter<io::Stderr> {
    /// Create a terminal emitter for stderr with explicit color mode.
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }
}

impl<W: Write> ReportSink for TerminalEmitter<W> {
    fn emit(&mut self, report: &ErrorReport, allow_interactive: bool) {
        if let Some(header) = report.header {
            self.write_colored(&header.to_string(), colors::BOLD);
            let _ = writeln!(self.writer);
        }
        if report.thread != ThreadId::MAIN {
            let _ = writeln!(self.writer, "Thread {}:", report.thread);
        }

        self.write_colored(&report.headline, colors::ERROR);
        let _ = writeln!(self.writer);

        for (index, frame) in report.frames.iter().enumerate() {
            self.write_frame(index, frame);
        }
        for detail in &report.details {
            let _ = writeln!(self.writer, " {detail}");
        }
        let _ = writeln!(self.writer);

        if allow_interactive {
            if let Some(block) = &report.suppression {
                self.write_colored(block, colors::HELP);
                let _ = writeln!(self.writer);
            }
        }
    }

    fn emit_warning(&mut self, message: &str) {
        self.write_colored("warning", colors::WARNING);
        let _ = writeln!(self.writer, ": {message}");
    }

    fn emit_used_suppressions(&mut self, used: &[UsedSuppression]) {
        for supp in used {
            let _ = writeln!(
                self.writer,
                "used_suppression: {:>6} {} {}:{}",
                supp.count, supp.name, supp.source, supp.line
            );
        }
    }

    fn emit_summary(&mut self, summary: &ErrorSummary) {
        let color = if summary.errors > 0 {
            colors::ERROR
        } else {
            colors::BOLD
        };
        self.write_colored(&summary.to_string(), color);
        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}
