//! The diagnostics engine: dedup, suppression and reporting.

use std::path::Path;

use rustc_hash::FxHashMap;
use vigil_context::{Context, ContextStore, Resolution, Symbolizer, ThreadId, Unwinder};
use vigil_match::{generic_match, LazyInput};
use vigil_supp::{SuppError, SuppId, SuppressionCatalog};

use crate::completer::FrameCompleter;
use crate::config::{EngineConfig, OutputFormat};
use crate::report::{suppression_block, ContextHeader, ErrorReport, ErrorSummary, UsedSuppression};
use crate::tool::ToolSyntax;
use crate::{ErrorCatalog, ErrorEvent, ErrorId, ErrorRecord, ErrorState, ReportSink, Tool};

/// What became of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New error, handed to the sink.
    Reported(ErrorId),
    /// New error, counted but not reported past the shown-errors cutoff.
    Unshown(ErrorId),
    /// New error hidden by a suppression.
    Suppressed(ErrorId),
    /// Repeat of a known error.
    Duplicate(ErrorId),
    /// Dropped: errors are disabled for the thread, collection stopped, or
    /// the event arrived while another was being processed.
    Ignored,
}

/// Options for [`DiagnosticsEngine::unique_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[expect(clippy::struct_excessive_bools, reason = "independent switches")]
pub struct UniqueOptions {
    /// Count the error in the summary.
    pub count: bool,
    /// Hand the error to the sink.
    pub print: bool,
    /// Allow per-error actions when printing.
    pub allow_interactive: bool,
}

impl Default for UniqueOptions {
    fn default() -> Self {
        UniqueOptions {
            count: true,
            print: true,
            allow_interactive: true,
        }
    }
}

/// Running error counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    /// Unsuppressed occurrences.
    pub found: u64,
    /// Distinct unsuppressed records.
    pub contexts: u64,
    /// Suppressed occurrences.
    pub suppressed: u64,
    /// Distinct suppressed records.
    pub suppressed_contexts: u64,
    /// Records handed to the sink.
    pub shown: u64,
}

impl ErrorCounts {
    fn summary(self) -> ErrorSummary {
        ErrorSummary {
            errors: self.found,
            contexts: self.contexts,
            suppressed: self.suppressed,
            suppressed_contexts: self.suppressed_contexts,
        }
    }
}

/// Owns every structure of the diagnostic core for one run.
///
/// Events go through [`maybe_record`](Self::maybe_record): the stack is
/// interned, compared against known errors, matched against suppressions,
/// and reported through the sink. The engine is single-threaded; wrap it in
/// a [`SharedEngine`](crate::SharedEngine) to feed it from several threads.
pub struct DiagnosticsEngine<T: Tool, S: Symbolizer, R: ReportSink> {
    tool: T,
    symbolizer: S,
    sink: R,
    config: EngineConfig,
    contexts: ContextStore,
    errors: ErrorCatalog<T>,
    supps: SuppressionCatalog,
    /// Nesting level of `disable_errors` per thread.
    disabled: FxHashMap<ThreadId, u32>,
    counts: ErrorCounts,
    next_unique: u32,
    /// The shown-errors cutoff has tripped.
    muted: bool,
    /// The total-errors cutoff has tripped and been announced.
    stopped: bool,
}

impl<T: Tool, S: Symbolizer, R: ReportSink> DiagnosticsEngine<T, S, R> {
    pub fn new(tool: T, symbolizer: S, sink: R, config: EngineConfig) -> Self {
        let depth = config.backtrace_depth();
        DiagnosticsEngine {
            tool,
            symbolizer,
            sink,
            config,
            contexts: ContextStore::with_max_depth(depth),
            errors: ErrorCatalog::new(),
            supps: SuppressionCatalog::new(depth),
            disabled: FxHashMap::default(),
            counts: ErrorCounts::default(),
            next_unique: 0,
            muted: false,
            stopped: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn tool(&self) -> &T {
        &self.tool
    }

    #[inline]
    pub fn sink(&self) -> &R {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut R {
        &mut self.sink
    }

    #[inline]
    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// The context store, for interning stacks captured elsewhere.
    #[inline]
    pub fn contexts_mut(&mut self) -> &mut ContextStore {
        &mut self.contexts
    }

    #[inline]
    pub fn errors(&self) -> &ErrorCatalog<T> {
        &self.errors
    }

    #[inline]
    pub fn suppressions(&self) -> &SuppressionCatalog {
        &self.supps
    }

    #[inline]
    pub fn counts(&self) -> ErrorCounts {
        self.counts
    }

    /// Load a suppressions file. On error nothing from the file is kept.
    pub fn load_suppressions(&mut self, path: &Path) -> Result<usize, SuppError> {
        self.supps.load_file(path, &ToolSyntax(&self.tool))
    }

    /// Load suppressions from text.
    pub fn load_suppressions_str(&mut self, source_name: &str, text: &str) -> Result<usize, SuppError> {
        self.supps.load_str(source_name, text, &ToolSyntax(&self.tool))
    }

    /// Ignore errors raised by `thread` until a matching
    /// [`enable_errors`](Self::enable_errors). Calls nest.
    pub fn disable_errors(&mut self, thread: ThreadId) {
        *self.disabled.entry(thread).or_insert(0) += 1;
    }

    /// Undo one [`disable_errors`](Self::disable_errors).
    pub fn enable_errors(&mut self, thread: ThreadId) {
        match self.disabled.get_mut(&thread) {
            Some(level) if *level > 1 => *level -= 1,
            Some(_) => {
                self.disabled.remove(&thread);
            }
            None => tracing::warn!(%thread, "enable_errors without matching disable_errors"),
        }
    }

    pub fn errors_disabled(&self, thread: ThreadId) -> bool {
        self.disabled.contains_key(&thread)
    }

    /// Capture `event.thread`'s stack and record the event.
    #[tracing::instrument(level = "trace", skip_all, fields(thread = %event.thread))]
    pub fn maybe_record(&mut self, unwinder: &dyn Unwinder, event: ErrorEvent<'_, T>) -> RecordOutcome {
        if !self.accepts(event.thread) {
            return RecordOutcome::Ignored;
        }
        let context = self.contexts.record(unwinder, event.thread, 0);
        self.process(context, &event)
    }

    /// Record an event whose stack was captured by the caller.
    pub fn record_at(&mut self, context: &'static Context, event: ErrorEvent<'_, T>) -> RecordOutcome {
        if !self.accepts(event.thread) {
            return RecordOutcome::Ignored;
        }
        self.process(context, &event)
    }

    /// Whether events from `thread` are processed at all. Trips the
    /// total-errors cutoff.
    fn accepts(&mut self, thread: ThreadId) -> bool {
        if self.errors_disabled(thread) {
            return false;
        }
        if self.stopped {
            return false;
        }
        let seen = self.counts.found + self.counts.suppressed;
        if self.config.error_limit && seen >= self.config.max_found as u64 {
            self.stopped = true;
            tracing::warn!(seen, "total error cutoff reached, collection stopped");
            let message = format!(
                "More than {} total errors detected.  I'm not reporting any more.\n\
                 Final error counts will be inaccurate.  Go fix your program!\n\
                 Rerun with the error limit disabled to disable this cutoff.",
                self.config.max_found
            );
            self.sink.emit_warning(&message);
            return false;
        }
        true
    }

    /// Resolution for duplicate detection: fewer frames once many errors
    /// have been shown.
    fn resolution(&self) -> Resolution {
        if self.counts.shown >= self.config.slowdown_after as u64 {
            Resolution::Coarse
        } else {
            Resolution::Medium
        }
    }

    fn next_unique(&mut self) -> u32 {
        let unique = self.next_unique;
        self.next_unique += 1;
        unique
    }

    fn process(&mut self, context: &'static Context, event: &ErrorEvent<'_, T>) -> RecordOutcome {
        let resolution = self.resolution();
        if let Some(id) =
            self.errors
                .find_and_promote(&self.tool, resolution, event.kind, context, event.extra)
        {
            let record = self.errors.get_mut(id);
            record.count += 1;
            match record.supp {
                Some(supp) => {
                    self.supps.note_repeat(supp);
                    self.counts.suppressed += 1;
                }
                None => self.counts.found += 1,
            }
            return RecordOutcome::Duplicate(id);
        }

        let unique = self.next_unique();
        let mut record = ErrorRecord::from_event(unique, context, event);
        self.tool.update_extra(&mut record);

        if let Some(supp) = self.find_suppression(&record) {
            record.supp = Some(supp);
            record.state = ErrorState::Suppressed;
            self.supps.note_match(supp);
            self.counts.suppressed += 1;
            self.counts.suppressed_contexts += 1;
            return RecordOutcome::Suppressed(self.errors.insert(record));
        }

        self.counts.found += 1;
        self.counts.contexts += 1;
        if self.config.error_limit && self.counts.shown >= self.config.max_shown as u64 {
            if !self.muted {
                self.muted = true;
                tracing::warn!(shown = self.counts.shown, "shown error cutoff reached, reporting stopped");
            }
            record.state = ErrorState::Unshown;
            return RecordOutcome::Unshown(self.errors.insert(record));
        }

        self.counts.shown += 1;
        let id = self.errors.insert(record);
        let report = self.build_report(self.errors.get(id), None);
        self.sink.emit(&report, true);
        RecordOutcome::Reported(id)
    }

    /// First suppression, in scan order, matching `record`; promoted to
    /// the head of the scan order.
    fn find_suppression(&mut self, record: &ErrorRecord<T>) -> Option<SuppId> {
        if self.supps.is_empty() {
            return None;
        }
        let tool = &self.tool;
        let mode = self.config.match_mode();
        let mut completer = FrameCompleter::new(record.context, &self.symbolizer);
        self.supps.find_and_promote(|supp| {
            tool.error_matches_suppression(record, supp)
                && generic_match(mode, supp.patterns(), &mut completer)
        })
    }

    fn build_report(&self, record: &ErrorRecord<T>, header: Option<ContextHeader>) -> ErrorReport {
        let mut completer = FrameCompleter::new(record.context, &self.symbolizer);
        let frames = completer.frame_lines(self.config.show_below_main, usize::MAX);
        let kind = self.tool.error_name(record);
        let suppression = match kind {
            Some(kind) if self.config.gen_suppressions => {
                let shown = frames.len().min(self.config.backtrace_depth());
                // Frames below main, or past the depth cap, are left to `...`.
                let truncated = shown < frames.len() || completer.has_input(frames.len());
                Some(suppression_block(
                    self.tool.name(),
                    kind,
                    &self.tool.extra_suppression_lines(record),
                    &frames[..shown],
                    truncated,
                ))
            }
            _ => None,
        };
        ErrorReport {
            unique: record.unique,
            tool: self.tool.name().to_string(),
            kind,
            thread: record.thread,
            count: record.count,
            headline: self.tool.describe(record),
            addr: record.addr,
            frames,
            details: self.tool.extra_details(record),
            suppression,
            header,
        }
    }

    /// Report an error that is not deduplicated or stored, such as a leak
    /// found at exit. Returns whether a suppression hid it.
    pub fn unique_error(
        &mut self,
        context: &'static Context,
        event: ErrorEvent<'_, T>,
        options: UniqueOptions,
    ) -> bool {
        let unique = self.next_unique();
        let mut record = ErrorRecord::from_event(unique, context, &event);
        self.tool.update_extra(&mut record);

        if let Some(supp) = self.find_suppression(&record) {
            self.supps.note_match(supp);
            if options.count {
                self.counts.suppressed += 1;
                self.counts.suppressed_contexts += 1;
            }
            return true;
        }

        if options.count {
            self.counts.found += 1;
            self.counts.contexts += 1;
        }
        if options.print {
            self.counts.shown += 1;
            let report = self.build_report(&record, None);
            self.sink.emit(&report, options.allow_interactive);
        }
        false
    }

    /// Re-emit the unsuppressed error hit most recently. Returns false when
    /// there is none.
    pub fn show_last_error(&mut self) -> bool {
        let Some((_, record)) = self.errors.iter().find(|(_, record)| !record.is_suppressed()) else {
            return false;
        };
        let report = self.build_report(record, None);
        self.sink.emit(&report, false);
        self.sink.flush();
        true
    }

    /// Suppressions that hid at least one error, in scan order.
    pub fn used_suppressions(&self) -> Vec<UsedSuppression> {
        self.supps
            .used()
            .map(|supp| UsedSuppression {
                count: supp.count(),
                occurrences: supp.occurrences(),
                name: supp.name().to_string(),
                source: self.supps.source_name(supp).to_string(),
                line: supp.line(),
            })
            .collect()
    }

    pub fn summary(&self) -> ErrorSummary {
        self.counts.summary()
    }

    /// End-of-run output.
    ///
    /// Text output above verbosity 1 lists every unsuppressed error, least
    /// frequent first, then the used suppressions. JSON output always
    /// lists the used suppressions; its errors were emitted as they came.
    /// Both end with the summary.
    pub fn show_all_errors(&mut self) {
        let verbose = self.config.verbosity > 1;
        if self.config.output == OutputFormat::Text && verbose {
            let mut listed: Vec<&ErrorRecord<T>> = self
                .errors
                .iter_created()
                .map(|(_, record)| record)
                .filter(|record| !record.is_suppressed())
                .collect();
            listed.sort_by_key(|record| record.count);
            let total = listed.len();
            let reports: Vec<ErrorReport> = listed
                .iter()
                .enumerate()
                .map(|(i, record)| {
                    let header = ContextHeader {
                        count: record.count,
                        index: i + 1,
                        total,
                    };
                    self.build_report(record, Some(header))
                })
                .collect();
            for report in &reports {
                self.sink.emit(report, false);
            }
        }
        if self.config.output == OutputFormat::Json || verbose {
            let used = self.used_suppressions();
            self.sink.emit_used_suppressions(&used);
        }
        let summary = self.summary();
        self.sink.emit_summary(&summary);
        self.sink.flush();
    }

    /// Process exit status: `error_exitcode` when any unsuppressed error
    /// was found, else 0.
    pub fn exit_code(&self, error_exitcode: i32) -> i32 {
        if self.counts.found > 0 {
            error_exitcode
        } else {
            0
        }
    }
}

/// Report a suppression loading failure and exit.
pub fn fatal_config_error(err: &SuppError) -> ! {
    eprintln!("FATAL: {err}");
    std::process::exit(1)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
