//! Hooks through which an analysis tool shapes error handling.

use std::fmt;

use vigil_context::Resolution;
use vigil_supp::{SuppLines, Suppression, SuppressionSyntax};

use crate::ErrorRecord;

/// An analysis tool: defines its error kinds and payloads, and how they are
/// compared, described and suppressed.
///
/// Only `name`, `describe` and `recognises_suppression_kind` are required.
pub trait Tool: Sized {
    /// Tool-defined error kind.
    type Kind: Copy + Eq + fmt::Debug;
    /// Tool-specific payload carried by each record.
    type Extra: Clone;

    /// Tool name as written in suppression files, e.g. `Memcheck`.
    fn name(&self) -> &str;

    /// Whether two payloads of the same kind describe the same error.
    ///
    /// `resolution` tells how precise the caller currently wants to be.
    fn eq_extra(
        &self,
        resolution: Resolution,
        kind: Self::Kind,
        a: &Self::Extra,
        b: &Self::Extra,
    ) -> bool {
        let _ = (resolution, kind, a, b);
        true
    }

    /// Refine a new record's payload before it is matched and reported.
    ///
    /// Called once per distinct record, never for duplicates.
    fn update_extra(&self, record: &mut ErrorRecord<Self>) {
        let _ = record;
    }

    /// Headline of the report, e.g. `Invalid read of size 4`.
    fn describe(&self, record: &ErrorRecord<Self>) -> String;

    /// Lines printed after the stack.
    fn extra_details(&self, record: &ErrorRecord<Self>) -> Vec<String> {
        let _ = record;
        Vec::new()
    }

    /// The suppression kind naming this record, if it can be suppressed.
    fn error_name(&self, record: &ErrorRecord<Self>) -> Option<&'static str> {
        let _ = record;
        None
    }

    /// Whether `supp` applies to `record`, frames aside.
    fn error_matches_suppression(&self, record: &ErrorRecord<Self>, supp: &Suppression) -> bool {
        self.error_name(record) == Some(supp.kind())
    }

    /// Whether `kind` is one of this tool's suppression kinds.
    fn recognises_suppression_kind(&self, kind: &str) -> bool;

    /// Read the extra lines a suppression of `kind` carries after its kind
    /// line. `None` rejects the suppression.
    fn read_extra_suppression_info(
        &self,
        kind: &str,
        lines: &mut SuppLines<'_>,
    ) -> Option<Vec<String>> {
        let _ = (kind, lines);
        Some(Vec::new())
    }

    /// Extra lines for a generated suppression of `record`.
    fn extra_suppression_lines(&self, record: &ErrorRecord<Self>) -> Vec<String> {
        let _ = record;
        Vec::new()
    }
}

/// The suppression-file view of a [`Tool`].
pub(crate) struct ToolSyntax<'a, T>(pub(crate) &'a T);

impl<T: Tool> SuppressionSyntax for ToolSyntax<'_, T> {
    fn tool_name(&self) -> &str {
        self.0.name()
    }

    fn recognises_kind(&self, kind: &str) -> bool {
        self.0.recognises_suppression_kind(kind)
    }

    fn read_extra(&self, kind: &str, lines: &mut SuppLines<'_>) -> Option<Vec<String>> {
        self.0.read_extra_suppression_info(kind, lines)
    }
}
