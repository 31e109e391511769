//! In-memory tool, symbolizer, unwinder and sink shared by the unit tests.

use std::cell::Cell;
use std::collections::HashMap;

use vigil_context::{Addr, InlineFrame, InlineFrames, Resolution, Symbolizer, ThreadId, Unwinder};
use vigil_supp::{LocPattern, SuppLines, Suppression};

use crate::{
    DiagnosticsEngine, EngineConfig, ErrorRecord, ErrorReport, ErrorSummary, ReportSink, Tool,
    UsedSuppression,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Kind {
    Leak,
    Read,
    Param,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Extra {
    pub(crate) size: u32,
    pub(crate) param: Option<String>,
}

impl Extra {
    pub(crate) fn size(size: u32) -> Self {
        Extra { size, param: None }
    }

    pub(crate) fn param(name: &str) -> Self {
        Extra {
            size: 0,
            param: Some(name.to_string()),
        }
    }
}

/// A memcheck-like tool. `Param` suppressions carry the parameter name on
/// the line after the kind.
pub(crate) struct Memcheck;

impl Tool for Memcheck {
    type Kind = Kind;
    type Extra = Extra;

    fn name(&self) -> &str {
        "Memcheck"
    }

    fn eq_extra(&self, _resolution: Resolution, kind: Kind, a: &Extra, b: &Extra) -> bool {
        match kind {
            Kind::Leak => true,
            Kind::Read => a.size == b.size,
            Kind::Param => a.param == b.param,
        }
    }

    fn describe(&self, record: &ErrorRecord<Self>) -> String {
        match record.kind() {
            Kind::Leak => "1 blocks are definitely lost".to_string(),
            Kind::Read => format!("Invalid read of size {}", record.extra().size),
            Kind::Param => format!(
                "Syscall param {} points to unaddressable byte(s)",
                record.extra().param.as_deref().unwrap_or("?")
            ),
        }
    }

    fn extra_details(&self, record: &ErrorRecord<Self>) -> Vec<String> {
        record
            .addr()
            .map(|addr| vec![format!("Address {addr} is not stack'd, malloc'd or (recently) free'd")])
            .unwrap_or_default()
    }

    fn error_name(&self, record: &ErrorRecord<Self>) -> Option<&'static str> {
        Some(match record.kind() {
            Kind::Leak => "Leak",
            Kind::Read => "Read",
            Kind::Param => "Param",
        })
    }

    fn error_matches_suppression(&self, record: &ErrorRecord<Self>, supp: &Suppression) -> bool {
        if self.error_name(record) != Some(supp.kind()) {
            return false;
        }
        match record.kind() {
            Kind::Param => supp.extra().first().map(String::as_str) == record.extra().param.as_deref(),
            Kind::Leak | Kind::Read => true,
        }
    }

    fn recognises_suppression_kind(&self, kind: &str) -> bool {
        matches!(kind, "Leak" | "Read" | "Param")
    }

    fn read_extra_suppression_info(&self, kind: &str, lines: &mut SuppLines<'_>) -> Option<Vec<String>> {
        if kind != "Param" {
            return Some(Vec::new());
        }
        let line = lines.peek_line()?;
        if LocPattern::is_location_line(line) || line == "}" {
            return None;
        }
        lines.next_line();
        Some(vec![line.to_string()])
    }

    fn extra_suppression_lines(&self, record: &ErrorRecord<Self>) -> Vec<String> {
        record.extra().param.iter().cloned().collect()
    }
}

/// Table-driven symbolizer counting its lookups.
#[derive(Default)]
pub(crate) struct TestSymbols {
    functions: HashMap<u64, String>,
    objects: HashMap<u64, String>,
    inlined: HashMap<u64, Vec<String>>,
    pub(crate) function_calls: Cell<usize>,
    pub(crate) object_calls: Cell<usize>,
    pub(crate) inline_calls: Cell<usize>,
}

impl TestSymbols {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn function(mut self, addr: u64, name: &str) -> Self {
        self.functions.insert(addr, name.to_string());
        self
    }

    #[must_use]
    pub(crate) fn object(mut self, addr: u64, name: &str) -> Self {
        self.objects.insert(addr, name.to_string());
        self
    }

    /// `addr` expands to `names`, innermost inlined call first.
    #[must_use]
    pub(crate) fn inlined(mut self, addr: u64, names: &[&str]) -> Self {
        self.inlined
            .insert(addr, names.iter().map(|name| (*name).to_string()).collect());
        self
    }
}

impl Symbolizer for TestSymbols {
    fn function_name(&self, addr: Addr) -> Option<String> {
        self.function_calls.set(self.function_calls.get() + 1);
        self.functions.get(&addr.raw()).cloned()
    }

    fn object_name(&self, addr: Addr) -> Option<String> {
        self.object_calls.set(self.object_calls.get() + 1);
        self.objects.get(&addr.raw()).cloned()
    }

    fn inline_frames(&self, addr: Addr) -> InlineFrames<'_> {
        self.inline_calls.set(self.inline_calls.get() + 1);
        match self.inlined.get(&addr.raw()) {
            Some(names) => Box::new(names.iter().map(move |name| InlineFrame::named(addr, name.clone()))),
            None => Box::new(std::iter::once(InlineFrame::raw(addr))),
        }
    }
}

/// Returns the same stack for every thread.
pub(crate) struct FixedUnwinder(pub(crate) Vec<Addr>);

impl Unwinder for FixedUnwinder {
    fn capture(&self, _thread: ThreadId, skip_frames: usize, max_depth: usize) -> Vec<Addr> {
        self.0.iter().copied().skip(skip_frames).take(max_depth).collect()
    }
}

/// Keeps everything it is given.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) reports: Vec<(ErrorReport, bool)>,
    pub(crate) warnings: Vec<String>,
    pub(crate) used: Vec<UsedSuppression>,
    pub(crate) summaries: Vec<ErrorSummary>,
    pub(crate) flushes: usize,
}

impl ReportSink for RecordingSink {
    fn emit(&mut self, report: &ErrorReport, allow_interactive: bool) {
        self.reports.push((report.clone(), allow_interactive));
    }

    fn emit_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn emit_used_suppressions(&mut self, used: &[UsedSuppression]) {
        self.used.extend_from_slice(used);
    }

    fn emit_summary(&mut self, summary: &ErrorSummary) {
        self.summaries.push(*summary);
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

pub(crate) type TestEngine = DiagnosticsEngine<Memcheck, TestSymbols, RecordingSink>;

pub(crate) fn engine(config: EngineConfig, symbols: TestSymbols) -> TestEngine {
    DiagnosticsEngine::new(Memcheck, symbols, RecordingSink::default(), config)
}

pub(crate) fn addrs(raw: &[u64]) -> Vec<Addr> {
    raw.iter().copied().map(Addr::new).collect()
}
