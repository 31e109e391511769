//! The in-memory list of loaded suppressions.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::parser::{parse_suppressions, SuppressionSyntax};
use crate::{LocPattern, SuppError};

/// Index of a [`Suppression`] in its [`SuppressionCatalog`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct SuppId(u32);

impl SuppId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SuppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SuppId({})", self.0)
    }
}

/// One suppression rule.
///
/// Immutable once loaded apart from its counters, which only the catalog
/// updates.
#[derive(Clone, Debug)]
pub struct Suppression {
    name: String,
    kind: String,
    patterns: Vec<LocPattern>,
    extra: Vec<String>,
    /// Index into the catalog's source names.
    source: usize,
    /// Line of the record's name in its file.
    line: usize,
    /// Distinct error records matched.
    count: u32,
    /// Error occurrences hidden, repeats included.
    occurrences: u64,
}

impl Suppression {
    pub(crate) fn new(
        name: String,
        kind: String,
        patterns: Vec<LocPattern>,
        extra: Vec<String>,
        source: usize,
        line: usize,
    ) -> Self {
        debug_assert!(patterns.iter().any(|p| !p.is_wildcard()));
        Suppression {
            name,
            kind,
            patterns,
            extra,
            source,
            line,
            count: 0,
            occurrences: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool-defined kind, the part after `:` in the tool line.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Location patterns, innermost frame first.
    #[inline]
    pub fn patterns(&self) -> &[LocPattern] {
        &self.patterns
    }

    /// Lines the tool read after the kind line.
    #[inline]
    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    /// Line of the record's name in its file.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of distinct error records this rule suppressed.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of error occurrences this rule hid, repeats included.
    #[inline]
    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }
}

/// All loaded suppressions, kept in most-recently-matched order.
pub struct SuppressionCatalog {
    rules: Vec<Suppression>,
    /// Scan order; the head is the most recently matched rule.
    order: Vec<SuppId>,
    /// File names, indexed by `Suppression::source`.
    sources: Vec<String>,
    max_callers: usize,
}

impl SuppressionCatalog {
    /// Create an empty catalog keeping at most `max_callers` location lines
    /// per rule.
    pub fn new(max_callers: usize) -> Self {
        SuppressionCatalog {
            rules: Vec::new(),
            order: Vec::new(),
            sources: Vec::new(),
            max_callers: max_callers.max(1),
        }
    }

    /// Load a suppressions file from disk.
    ///
    /// Returns the number of rules added. On error nothing from this file is
    /// kept.
    pub fn load_file(
        &mut self,
        path: &Path,
        syntax: &dyn SuppressionSyntax,
    ) -> Result<usize, SuppError> {
        if path.is_dir() {
            return Err(SuppError::IsDirectory {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| SuppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&path.display().to_string(), &text, syntax)
    }

    /// Load suppressions from text, naming them after `source_name` in
    /// messages.
    pub fn load_str(
        &mut self,
        source_name: &str,
        text: &str,
        syntax: &dyn SuppressionSyntax,
    ) -> Result<usize, SuppError> {
        let source = self.sources.len();
        let parsed = parse_suppressions(text, source, syntax, self.max_callers).map_err(|err| {
            SuppError::Syntax {
                source_name: source_name.to_string(),
                line: err.line,
                message: err.message.to_string(),
            }
        })?;

        self.sources.push(source_name.to_string());
        let added = parsed.len();
        for supp in parsed {
            let id = SuppId(
                u32::try_from(self.rules.len())
                    .unwrap_or_else(|_| panic!("too many suppressions loaded")),
            );
            self.rules.push(supp);
            self.order.push(id);
        }
        tracing::debug!(source = source_name, added, total = self.rules.len(), "loaded suppressions");
        Ok(added)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[inline]
    pub fn get(&self, id: SuppId) -> &Suppression {
        &self.rules[id.index()]
    }

    /// Name of the file `supp` was loaded from.
    pub fn source_name(&self, supp: &Suppression) -> &str {
        &self.sources[supp.source]
    }

    /// Rules in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (SuppId, &Suppression)> + '_ {
        self.order.iter().map(|&id| (id, &self.rules[id.index()]))
    }

    /// Find the first rule, in scan order, accepted by `matches`, and move
    /// it to the head of the scan order.
    pub fn find_and_promote(
        &mut self,
        mut matches: impl FnMut(&Suppression) -> bool,
    ) -> Option<SuppId> {
        let pos = self
            .order
            .iter()
            .position(|&id| matches(&self.rules[id.index()]))?;
        let id = self.order.remove(pos);
        self.order.insert(0, id);
        if pos > 0 {
            tracing::trace!(name = %self.rules[id.index()].name, from = pos, "promoted suppression");
        }
        Some(id)
    }

    /// Count a newly suppressed error record against `id`.
    pub fn note_match(&mut self, id: SuppId) {
        let supp = &mut self.rules[id.index()];
        supp.count += 1;
        supp.occurrences += 1;
    }

    /// Count a repeat occurrence of an already suppressed record.
    pub fn note_repeat(&mut self, id: SuppId) {
        self.rules[id.index()].occurrences += 1;
    }

    /// Rules that hid at least one error, in scan order.
    pub fn used(&self) -> impl Iterator<Item = &Suppression> + '_ {
        self.iter()
            .map(|(_, supp)| supp)
            .filter(|supp| supp.occurrences > 0)
    }
}
