//! Vigil errors - deduplication, suppression and reporting
//!
//! The top of the diagnostic core. A tool raises [`ErrorEvent`]s; the
//! [`DiagnosticsEngine`]:
//! - interns the event's call stack in a `ContextStore`
//! - folds repeats into one [`ErrorRecord`] with an occurrence count
//! - matches new records against the loaded suppressions, symbolizing and
//!   inline-expanding frames only as far as each match needs
//! - hands the rest to a [`ReportSink`], subject to the error cutoffs
//!
//! Tools plug in through the [`Tool`] trait; the stack unwinder and the
//! symbolizer come from `vigil_context`.

mod catalog;
mod completer;
mod config;
mod emitter;
mod engine;
mod record;
mod report;
mod shared;
mod tool;

use std::sync::Once;

pub use catalog::ErrorCatalog;
pub use completer::{FrameLine, UNKNOWN_NAME};
pub use config::{EngineConfig, OutputFormat};
pub use emitter::{ColorMode, JsonEmitter, ReportSink, TerminalEmitter};
pub use engine::{
    fatal_config_error, DiagnosticsEngine, ErrorCounts, RecordOutcome, UniqueOptions,
};
pub use record::{ErrorEvent, ErrorId, ErrorRecord, ErrorState};
pub use report::{
    ContextHeader, ErrorReport, ErrorSummary, UsedSuppression, SUPPRESSION_NAME_PLACEHOLDER,
};
pub use shared::SharedEngine;
pub use tool::Tool;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for the diagnostic core.
///
/// Only installs a subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=vigil_errors=debug,vigil_context=debug`. Safe to call more
/// than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
pub(crate) mod test_support;
