//! Thread-safe handle to a diagnostics engine.
//!
//! Events from every thread of the instrumented program are serialized
//! through one lock, held for the whole processing of an event. A fault
//! raised while the same thread is already inside the engine (typically
//! from the report sink) is dropped rather than deadlocking on the lock or
//! re-entering the structures mid-update.

use std::cell::Cell;
use std::sync::Arc;

use parking_lot::Mutex;
use vigil_context::{Symbolizer, Unwinder};

use crate::{DiagnosticsEngine, ErrorEvent, RecordOutcome, ReportSink, Tool};

thread_local! {
    static IN_ENGINE: Cell<bool> = const { Cell::new(false) };
}

/// Clears the in-engine flag on drop, unwinding included.
struct ReentryGuard;

impl ReentryGuard {
    fn enter() -> Option<ReentryGuard> {
        if IN_ENGINE.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(ReentryGuard)
        }
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        IN_ENGINE.with(|flag| flag.set(false));
    }
}

/// Shared, lock-protected [`DiagnosticsEngine`].
pub struct SharedEngine<T: Tool, S: Symbolizer, R: ReportSink>(Arc<Mutex<DiagnosticsEngine<T, S, R>>>);

impl<T: Tool, S: Symbolizer, R: ReportSink> Clone for SharedEngine<T, S, R> {
    fn clone(&self) -> Self {
        SharedEngine(Arc::clone(&self.0))
    }
}

impl<T: Tool, S: Symbolizer, R: ReportSink> SharedEngine<T, S, R> {
    pub fn new(engine: DiagnosticsEngine<T, S, R>) -> Self {
        SharedEngine(Arc::new(Mutex::new(engine)))
    }

    /// Run `f` inside the engine's critical section.
    ///
    /// Returns `None`, without running `f`, when called from a thread that
    /// is already inside the engine.
    pub fn with<U>(&self, f: impl FnOnce(&mut DiagnosticsEngine<T, S, R>) -> U) -> Option<U> {
        let Some(_guard) = ReentryGuard::enter() else {
            tracing::warn!("dropping diagnostic event raised while processing another");
            return None;
        };
        let mut engine = self.0.lock();
        Some(f(&mut engine))
    }

    /// [`DiagnosticsEngine::maybe_record`] under the lock.
    pub fn maybe_record(&self, unwinder: &dyn Unwinder, event: ErrorEvent<'_, T>) -> RecordOutcome {
        self.with(|engine| engine.maybe_record(unwinder, event))
            .unwrap_or(RecordOutcome::Ignored)
    }
}
