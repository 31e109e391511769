//! Location patterns: the frame-matching part of a suppression.

use std::fmt;

use vigil_match::{is_simple_pattern, string_match, PatternElement};

/// Which name of a frame a pattern looks at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// The function containing the frame (`fun:`).
    Function,
    /// The object file containing the frame (`obj:`).
    Object,
}

/// A glob over a function or object name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamePattern {
    text: String,
    /// No `*`/`?`: compare with `==`.
    simple: bool,
}

impl NamePattern {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let simple = is_simple_pattern(&text);
        NamePattern { text, simple }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.simple {
            self.text == name
        } else {
            string_match(&self.text, name)
        }
    }
}

/// One location line of a suppression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocPattern {
    /// `...`: any number of frames, including none.
    Wildcard,
    /// `obj:<glob>`
    Object(NamePattern),
    /// `fun:<glob>`
    Function(NamePattern),
}

impl LocPattern {
    /// Parse a trimmed location line.
    pub fn parse(line: &str) -> Option<LocPattern> {
        if line == "..." {
            return Some(LocPattern::Wildcard);
        }
        if let Some(rest) = line.strip_prefix("fun:") {
            return Some(LocPattern::Function(NamePattern::new(rest)));
        }
        if let Some(rest) = line.strip_prefix("obj:") {
            return Some(LocPattern::Object(NamePattern::new(rest)));
        }
        None
    }

    /// Whether `line` is a location line at all.
    pub fn is_location_line(line: &str) -> bool {
        line == "..." || line.starts_with("fun:") || line.starts_with("obj:")
    }

    /// The name this pattern needs resolved, and the glob to match it with.
    pub fn name_pattern(&self) -> Option<(NameKind, &NamePattern)> {
        match self {
            LocPattern::Wildcard => None,
            LocPattern::Object(p) => Some((NameKind::Object, p)),
            LocPattern::Function(p) => Some((NameKind::Function, p)),
        }
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, LocPattern::Wildcard)
    }
}

impl PatternElement for LocPattern {
    fn is_star(&self) -> bool {
        self.is_wildcard()
    }
}

impl fmt::Display for LocPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocPattern::Wildcard => f.write_str("..."),
            LocPattern::Object(p) => write!(f, "obj:{}", p.as_str()),
            LocPattern::Function(p) => write!(f, "fun:{}", p.as_str()),
        }
    }
}
