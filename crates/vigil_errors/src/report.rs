//! What the engine hands to a report sink.

use std::fmt::{self, Write};

use vigil_context::{Addr, ThreadId};

use crate::FrameLine;

/// Placeholder name in generated suppressions.
pub const SUPPRESSION_NAME_PLACEHOLDER: &str = "<insert_a_suppression_name_here>";

/// Position of a record in the shutdown listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextHeader {
    /// Occurrences of the record.
    pub count: u64,
    /// 1-based position in the listing.
    pub index: usize,
    /// Number of listed contexts.
    pub total: usize,
}

impl fmt::Display for ContextHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} errors in context {} of {}:",
            self.count, self.index, self.total
        )
    }
}

/// A fully resolved error, ready to print.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub unique: u32,
    pub tool: String,
    /// Suppression kind of the error, when it has one.
    pub kind: Option<&'static str>,
    pub thread: ThreadId,
    pub count: u64,
    pub headline: String,
    pub addr: Option<Addr>,
    /// Logical frames, innermost first.
    pub frames: Vec<FrameLine>,
    pub details: Vec<String>,
    /// Ready-to-paste suppression, when generation is enabled.
    pub suppression: Option<String>,
    /// Set when listed at shutdown.
    pub header: Option<ContextHeader>,
}

/// Build the text of a suppression matching `frames`.
///
/// `truncated` means the stack goes on past `frames`; the block then ends
/// with `...` so it still covers the whole stack.
pub(crate) fn suppression_block(
    tool: &str,
    kind: &str,
    extra: &[String],
    frames: &[FrameLine],
    truncated: bool,
) -> String {
    let mut block = String::from("{\n");
    let _ = writeln!(block, "   {SUPPRESSION_NAME_PLACEHOLDER}");
    let _ = writeln!(block, "   {tool}:{kind}");
    for line in extra {
        let _ = writeln!(block, "   {line}");
    }
    for frame in frames {
        let _ = writeln!(block, "   {}", frame.suppression_line());
    }
    if truncated {
        block.push_str("   ...\n");
    }
    block.push('}');
    block
}

/// A suppression that hid at least one error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsedSuppression {
    /// Distinct records hidden.
    pub count: u32,
    /// Occurrences hidden, repeats included.
    pub occurrences: u64,
    pub name: String,
    pub source: String,
    pub line: usize,
}

/// Final error counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorSummary {
    /// Unsuppressed occurrences.
    pub errors: u64,
    /// Distinct unsuppressed records.
    pub contexts: u64,
    /// Suppressed occurrences.
    pub suppressed: u64,
    /// Distinct suppressed records.
    pub suppressed_contexts: u64,
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ERROR SUMMARY: {} errors from {} contexts (suppressed: {} from {})",
            self.errors, self.contexts, self.suppressed, self.suppressed_contexts
        )
    }
}
