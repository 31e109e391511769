//! Suppressions file parser.

use crate::catalog::Suppression;
use crate::pattern::LocPattern;

/// Hard limit on location lines in one record.
pub const MAX_LOCATION_LINES: usize = 500;

/// Tool-specific part of the suppression syntax.
pub trait SuppressionSyntax {
    /// Name of the active tool, as written in the `tool1,tool2:kind` line.
    fn tool_name(&self) -> &str;

    /// Whether `kind` is a suppression kind of the active tool.
    fn recognises_kind(&self, kind: &str) -> bool;

    /// Read the tool's extra lines following the kind line.
    ///
    /// Called with the cursor just after the kind line. Implementations
    /// should `peek` and leave location lines and the closing `}` alone.
    /// Returning `None` rejects the record.
    fn read_extra(&self, kind: &str, lines: &mut SuppLines<'_>) -> Option<Vec<String>> {
        let _ = (kind, lines);
        Some(Vec::new())
    }
}

/// Cursor over the significant lines of a suppressions file.
///
/// Blank lines and lines starting with `#` are skipped; the others are
/// returned trimmed.
pub struct SuppLines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    /// 1-based number of the last line returned.
    lineno: usize,
}

impl<'a> SuppLines<'a> {
    pub fn new(text: &'a str) -> Self {
        SuppLines {
            lines: text.lines().collect(),
            pos: 0,
            lineno: 0,
        }
    }

    fn find_next(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&ix| {
            let line = self.lines[ix].trim();
            !line.is_empty() && !line.starts_with('#')
        })
    }

    /// Next significant line, or `None` at end of input.
    pub fn next_line(&mut self) -> Option<&'a str> {
        match self.find_next() {
            Some(ix) => {
                self.pos = ix + 1;
                self.lineno = ix + 1;
                Some(self.lines[ix].trim())
            }
            None => {
                self.pos = self.lines.len();
                self.lineno = self.lineno.max(self.lines.len());
                None
            }
        }
    }

    /// The next significant line, without consuming it.
    pub fn peek_line(&self) -> Option<&'a str> {
        self.find_next().map(|ix| self.lines[ix].trim())
    }

    /// Line number of the last line returned by `next_line`.
    pub fn line_number(&self) -> usize {
        self.lineno
    }
}

/// A syntax error before the source name is attached.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub(crate) line: usize,
    pub(crate) message: &'static str,
}

fn bomb<T>(lines: &SuppLines<'_>, message: &'static str) -> Result<T, SyntaxError> {
    Err(SyntaxError {
        line: lines.line_number(),
        message,
    })
}

fn tool_listed(tools: &str, tool: &str) -> bool {
    tools.split(',').any(|t| t.trim() == tool)
}

/// Parse a whole suppressions file.
///
/// Records naming other tools are skipped. At most `max_callers` location
/// lines of each record are kept; further lines are read and replaced by a
/// single `...`.
pub(crate) fn parse_suppressions(
    text: &str,
    source: usize,
    syntax: &dyn SuppressionSyntax,
    max_callers: usize,
) -> Result<Vec<Suppression>, SyntaxError> {
    let mut lines = SuppLines::new(text);
    let mut parsed = Vec::new();

    while let Some(open) = lines.next_line() {
        if open != "{" {
            return bomb(&lines, "expected '{' or end-of-file");
        }

        let name = match lines.next_line() {
            None | Some("}") => return bomb(&lines, "unexpected '}'"),
            Some(name) => name,
        };
        let name_line = lines.line_number();

        let Some(tool_kind) = lines.next_line() else {
            return bomb(&lines, "unexpected end-of-file (expecting tool:suppr)");
        };
        let Some((tools, kind)) = tool_kind.split_once(':') else {
            return bomb(&lines, "malformed 'tool1,tool2,...:supp' line");
        };

        if !tool_listed(tools, syntax.tool_name()) {
            loop {
                match lines.next_line() {
                    None => {
                        return bomb(&lines, "unexpected end-of-file (when skipping suppression)")
                    }
                    Some("}") => break,
                    Some(_) => {}
                }
            }
            continue;
        }

        if !syntax.recognises_kind(kind) {
            return bomb(&lines, "unknown tool suppression type");
        }

        let Some(extra) = syntax.read_extra(kind, &mut lines) else {
            return bomb(&lines, "bad or missing extra suppression info");
        };

        let mut patterns: Vec<LocPattern> = Vec::new();
        loop {
            let Some(line) = lines.next_line() else {
                return bomb(&lines, "unexpected end-of-file (when reading stack trace)");
            };
            if line == "}" {
                if patterns.is_empty() {
                    return bomb(&lines, "missing stack trace");
                }
                break;
            }
            if patterns.len() == MAX_LOCATION_LINES {
                return bomb(&lines, "too many callers in stack trace");
            }
            if !patterns.is_empty() && patterns.len() >= max_callers {
                // Past the configured depth: the dropped lines become `...`,
                // so the rule still covers the rest of the stack.
                while let Some(rest) = lines.next_line() {
                    if rest == "}" {
                        break;
                    }
                }
                if !patterns.last().is_some_and(LocPattern::is_wildcard) {
                    patterns.push(LocPattern::Wildcard);
                }
                break;
            }
            match LocPattern::parse(line) {
                Some(pattern) => patterns.push(pattern),
                None => {
                    return bomb(
                        &lines,
                        "location should be \"...\", or should start with \"fun:\" or \"obj:\"",
                    )
                }
            }
        }

        if patterns.iter().all(LocPattern::is_wildcard) {
            return bomb(
                &lines,
                "suppression must contain at least one location line which is not \"...\"",
            );
        }

        parsed.push(Suppression::new(
            name.to_string(),
            kind.to_string(),
            patterns,
            extra,
            source,
            name_line,
        ));
    }

    Ok(parsed)
}
