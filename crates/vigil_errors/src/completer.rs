//! Lazily symbolized, lazily inline-expanded view of a context.
//!
//! A context holds raw return addresses. Suppressions and reports work on
//! logical frames: each raw address may expand into several inlined calls.
//! [`FrameCompleter`] expands raw frames only as far as a consumer asks,
//! and resolves each name at most once.

use rustc_hash::FxHashMap;
use vigil_context::{Addr, Context, Symbolizer};
use vigil_match::LazyInput;
use vigil_supp::{LocPattern, NameKind};

/// Name used when the symbolizer cannot resolve an address.
pub const UNKNOWN_NAME: &str = "???";

struct Position {
    addr: Addr,
    /// Outer `None`: not asked yet.
    function: Option<Option<String>>,
}

/// One logical frame, fully resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameLine {
    pub addr: Addr,
    pub function: Option<String>,
    pub object: Option<String>,
}

impl FrameLine {
    /// `fun:` when the function is known, else `obj:`, else `obj:*`.
    pub fn suppression_line(&self) -> String {
        match (&self.function, &self.object) {
            (Some(function), _) => format!("fun:{function}"),
            (None, Some(object)) => format!("obj:{object}"),
            (None, None) => "obj:*".to_string(),
        }
    }
}

pub(crate) struct FrameCompleter<'a, S: Symbolizer> {
    frames: &'a [Addr],
    symbolizer: &'a S,
    /// Raw frames expanded so far.
    expanded: usize,
    positions: Vec<Position>,
    objects: FxHashMap<Addr, Option<String>>,
}

impl<'a, S: Symbolizer> FrameCompleter<'a, S> {
    pub(crate) fn new(context: &'a Context, symbolizer: &'a S) -> Self {
        FrameCompleter {
            frames: context.frames(),
            symbolizer,
            expanded: 0,
            positions: Vec::new(),
            objects: FxHashMap::default(),
        }
    }

    /// Expand raw frames until position `index` exists or the context runs
    /// out.
    fn expand_to(&mut self, index: usize) -> bool {
        while self.positions.len() <= index && self.expanded < self.frames.len() {
            let raw = self.frames[self.expanded];
            self.expanded += 1;
            self.positions
                .extend(self.symbolizer.inline_frames(raw).map(|frame| Position {
                    addr: frame.addr,
                    function: frame.function.map(Some),
                }));
        }
        index < self.positions.len()
    }

    /// Function name at an existing position.
    fn function(&mut self, index: usize) -> Option<&str> {
        let symbolizer = self.symbolizer;
        let position = &mut self.positions[index];
        let addr = position.addr;
        position
            .function
            .get_or_insert_with(|| symbolizer.function_name(addr))
            .as_deref()
    }

    /// Object name at an existing position.
    fn object(&mut self, index: usize) -> Option<&str> {
        let symbolizer = self.symbolizer;
        let addr = self.positions[index].addr;
        self.objects
            .entry(addr)
            .or_insert_with(|| symbolizer.object_name(addr))
            .as_deref()
    }

    /// Resolve every logical frame, stopping after `main` unless
    /// `below_main`, and after `limit` frames.
    pub(crate) fn frame_lines(&mut self, below_main: bool, limit: usize) -> Vec<FrameLine> {
        let mut lines = Vec::new();
        let mut index = 0;
        while lines.len() < limit && self.expand_to(index) {
            let function = self.function(index).map(str::to_owned);
            let object = self.object(index).map(str::to_owned);
            let is_main = function.as_deref() == Some("main");
            lines.push(FrameLine {
                addr: self.positions[index].addr,
                function,
                object,
            });
            if is_main && !below_main {
                break;
            }
            index += 1;
        }
        lines
    }

    /// Raw frames expanded so far.
    #[cfg(test)]
    pub(crate) fn expanded(&self) -> usize {
        self.expanded
    }
}

impl<S: Symbolizer> LazyInput<LocPattern> for FrameCompleter<'_, S> {
    fn has_input(&mut self, index: usize) -> bool {
        self.expand_to(index)
    }

    fn matches(&mut self, element: &LocPattern, index: usize) -> bool {
        let Some((kind, pattern)) = element.name_pattern() else {
            return false;
        };
        let name = match kind {
            NameKind::Function => self.function(index),
            NameKind::Object => self.object(index),
        };
        pattern.matches(name.unwrap_or(UNKNOWN_NAME))
    }
}
