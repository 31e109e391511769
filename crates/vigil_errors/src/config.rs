//! Engine configuration.

use vigil_context::MAX_BACKTRACE_DEPTH;
use vigil_match::MatchMode;

/// How reports are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Configuration for a [`DiagnosticsEngine`](crate::DiagnosticsEngine).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[expect(
    clippy::struct_excessive_bools,
    reason = "independent user-facing switches"
)]
pub struct EngineConfig {
    /// Enables both cutoffs below.
    pub error_limit: bool,
    /// Distinct errors reported before reporting stops.
    pub max_shown: usize,
    /// Total errors seen before all processing stops.
    pub max_found: usize,
    /// Shown errors after which duplicate detection compares fewer frames.
    pub slowdown_after: usize,
    /// Report format.
    pub output: OutputFormat,
    /// Print a ready-to-paste suppression after each reported error.
    pub gen_suppressions: bool,
    /// Frames captured per stack, and location lines honoured per
    /// suppression.
    pub backtrace_size: usize,
    /// Keep frames below `main` in reports and generated suppressions.
    pub show_below_main: bool,
    /// Suppressions must account for the whole stack. When false a
    /// suppression matching the innermost frames is enough.
    pub match_whole_stack: bool,
    /// Above 1, shutdown lists every error context.
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            error_limit: true,
            max_shown: 1000,
            max_found: 10_000_000,
            slowdown_after: 100,
            output: OutputFormat::Text,
            gen_suppressions: false,
            backtrace_size: 12,
            show_below_main: false,
            match_whole_stack: true,
            verbosity: 1,
        }
    }
}

impl EngineConfig {
    /// A config with no cutoffs (for testing).
    pub fn unlimited() -> Self {
        EngineConfig {
            error_limit: false,
            ..EngineConfig::default()
        }
    }

    /// `backtrace_size`, clamped to what the context store supports.
    pub fn backtrace_depth(&self) -> usize {
        self.backtrace_size.clamp(1, MAX_BACKTRACE_DEPTH)
    }

    pub(crate) fn match_mode(&self) -> MatchMode {
        if self.match_whole_stack {
            MatchMode::Whole
        } else {
            MatchMode::Prefix
        }
    }
}
