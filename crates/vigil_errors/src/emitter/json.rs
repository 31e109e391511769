//! JSON Emitter
//!
//! Machine-readable report output: one JSON object per line.

use std::io::Write;

use crate::{ErrorReport, ErrorSummary, UsedSuppression};

use super::{escape_json, json_opt, trailing_comma, ReportSink};

/// JSON emitter for machine-readable output.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create a new JSON emitter.
    pub fn new(writer: W) -> Self {
        JsonEmitter { writer }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> ReportSink for JsonEmitter<W> {
    fn emit(&mut self, report: &ErrorReport, allow_interactive: bool) {
        let _ = write!(
            self.writer,
            "{{\"type\":\"error\",\"unique\":{},\"tool\":\"{}\",\"kind\":{},\"tid\":{},\"count\":{},\"what\":\"{}\"",
            report.unique,
            escape_json(&report.tool),
            json_opt(report.kind),
            report.thread,
            report.count,
            escape_json(&report.headline),
        );
        match report.addr {
            Some(addr) => {
                let _ = write!(self.writer, ",\"addr\":\"{addr}\"");
            }
            None => {
                let _ = write!(self.writer, ",\"addr\":null");
            }
        }
        if let Some(header) = report.header {
            let _ = write!(
                self.writer,
                ",\"context\":{{\"index\":{},\"total\":{}}}",
                header.index, header.total
            );
        }

        let _ = write!(self.writer, ",\"stack\":[");
        for (i, frame) in report.frames.iter().enumerate() {
            let comma = trailing_comma(i, report.frames.len());
            let _ = write!(
                self.writer,
                "{{\"ip\":\"{}\",\"fn\":{},\"obj\":{}}}{comma}",
                frame.addr,
                json_opt(frame.function.as_deref()),
                json_opt(frame.object.as_deref()),
            );
        }
        let _ = write!(self.writer, "]");

        let _ = write!(self.writer, ",\"details\":[");
        for (i, detail) in report.details.iter().enumerate() {
            let comma = trailing_comma(i, report.details.len());
            let _ = write!(self.writer, "\"{}\"{comma}", escape_json(detail));
        }
        let _ = write!(self.writer, "]");

        if allow_interactive {
            if let Some(block) = &report.suppression {
                let _ = write!(self.writer, ",\"suppression\":\"{}\"", escape_json(block));
            }
        }
        let _ = writeln!(self.writer, "}}");
    }

    fn emit_warning(&mut self, message: &str) {
        let _ = writeln!(
            self.writer,
            "{{\"type\":\"warning\",\"message\":\"{}\"}}",
            escape_json(message)
        );
    }

    fn emit_used_suppressions(&mut self, used: &[UsedSuppression]) {
        for supp in used {
            let _ = writeln!(
                self.writer,
                "{{\"type\":\"used_suppression\",\"name\":\"{}\",\"count\":{},\"occurrences\":{},\"source\":\"{}\",\"line\":{}}}",
                escape_json(&supp.name),
                supp.count,
                supp.occurrences,
                escape_json(&supp.source),
                supp.line
            );
        }
    }

    fn emit_summary(&mut self, summary: &ErrorSummary) {
        let _ = writeln!(
            self.writer,
            "{{\"type\":\"summary\",\"errors\":{},\"contexts\":{},\"suppressed\":{},\"suppressed_contexts\":{}}}",
            summary.errors, summary.contexts, summary.suppressed, summary.suppressed_contexts
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}
