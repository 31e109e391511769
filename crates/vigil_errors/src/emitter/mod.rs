//! Report Sinks
//!
//! Where reports go:
//! - Terminal: human-readable text with optional ANSI color
//! - JSON: one object per line, for tooling
//!
//! The engine drives every sink through the `ReportSink` trait and never
//! writes output itself.

mod json;
mod terminal;

pub use json::JsonEmitter;
pub use terminal::{ColorMode, TerminalEmitter};

use std::fmt::Write;

use crate::{ErrorReport, ErrorSummary, UsedSuppression};

/// Returns a trailing comma for JSON list serialization.
///
/// Returns `","` when `index` is not the last element, `""` otherwise.
pub(crate) fn trailing_comma(index: usize, total: usize) -> &'static str {
    if index + 1 < total {
        ","
    } else {
        ""
    }
}

/// Destination for error reports.
pub trait ReportSink {
    /// Emit one error.
    ///
    /// `allow_interactive` is false when errors are listed at shutdown;
    /// per-error actions such as printing a generated suppression only
    /// happen when it is true.
    fn emit(&mut self, report: &ErrorReport, allow_interactive: bool);

    /// Emit a one-off warning about the diagnostic machinery itself.
    fn emit_warning(&mut self, message: &str);

    /// List the suppressions that hid at least one error.
    fn emit_used_suppressions(&mut self, used: &[UsedSuppression]);

    /// Emit the final counts.
    fn emit_summary(&mut self, summary: &ErrorSummary);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Escape a string for JSON output.
pub(crate) fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}

/// A JSON string literal, or `null`.
pub(crate) fn json_opt(s: Option<&str>) -> String {
    match s {
        Some(s) => format!("\"{}\"", escape_json(s)),
        None => "null".to_string(),
    }
}
