//! Star-pattern matching over lazily produced sequences.
//!
//! [`generic_match`] compares a pattern (a slice of elements, some of which
//! may be wildcards) against an input sequence that is only produced as far
//! as the match needs it. Suppression rules use it with call-stack frames as
//! the input; [`string_match`] uses it with characters.
//!
//! Matching is frugal: a star first tries to match nothing and only
//! consumes input when the rest of the pattern fails.
//!
//! ```text
//! ma ('*':ps) (i:is) = ma ps (i:is) || ma ('*':ps) is
//! ma ('*':ps) []     = ma ps []
//! ma ('?':ps) (i:is) = ma ps is
//! ma ('?':ps) []     = False
//! ma (p:ps)   (i:is) = p == i && ma ps is
//! ma (p:ps)   []     = False
//! ma []       (i:is) = False for Whole, True for Prefix
//! ma []       []     = True
//! ```

/// One element of a pattern.
pub trait PatternElement {
    /// Matches zero or more input positions.
    fn is_star(&self) -> bool;

    /// Matches exactly one input position, whatever it is.
    fn is_query(&self) -> bool {
        false
    }
}

/// An input sequence produced on demand.
///
/// Positions are visited in increasing order, except that a star may make
/// the matcher revisit earlier positions; implementations should cache what
/// they compute.
pub trait LazyInput<P: ?Sized> {
    /// Whether position `index` exists. May extend the sequence.
    fn has_input(&mut self, index: usize) -> bool;

    /// Whether the non-wildcard `element` matches position `index`.
    ///
    /// Only called for positions that `has_input` confirmed.
    fn matches(&mut self, element: &P, index: usize) -> bool;
}

/// Whether the pattern must consume the whole input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// Pattern and input must end together.
    Whole,
    /// The pattern may stop before the input does.
    Prefix,
}

/// Match `pattern` against `input`.
///
/// Only the most recent star is ever retried: a later star can absorb
/// anything an earlier one would, so a match costs on the order of
/// `pattern.len() * input length` element comparisons.
pub fn generic_match<P, I>(mode: MatchMode, pattern: &[P], input: &mut I) -> bool
where
    P: PatternElement,
    I: LazyInput<P> + ?Sized,
{
    let mut ix_patt = 0;
    let mut ix_input = 0;
    // Pattern index after the last star, and the input index it resumes at.
    let mut backtrack: Option<(usize, usize)> = None;

    loop {
        match pattern.get(ix_patt) {
            Some(elem) if elem.is_star() => {
                // Try the star as empty first.
                ix_patt += 1;
                backtrack = Some((ix_patt, ix_input));
                continue;
            }
            Some(elem) if elem.is_query() => {
                if input.has_input(ix_input) {
                    ix_patt += 1;
                    ix_input += 1;
                    continue;
                }
            }
            Some(elem) => {
                if input.has_input(ix_input) && input.matches(elem, ix_input) {
                    ix_patt += 1;
                    ix_input += 1;
                    continue;
                }
            }
            None => {
                if mode == MatchMode::Prefix || !input.has_input(ix_input) {
                    return true;
                }
            }
        }

        // Mismatch: let the last star eat one more input position.
        match backtrack {
            Some((patt, resume)) if input.has_input(resume) => {
                backtrack = Some((patt, resume + 1));
                ix_patt = patt;
                ix_input = resume + 1;
            }
            _ => return false,
        }
    }
}

impl PatternElement for char {
    fn is_star(&self) -> bool {
        *self == '*'
    }

    fn is_query(&self) -> bool {
        *self == '?'
    }
}

/// Characters of a string, as a fully materialized input.
struct CharInput(Vec<char>);

impl LazyInput<char> for CharInput {
    fn has_input(&mut self, index: usize) -> bool {
        index < self.0.len()
    }

    fn matches(&mut self, element: &char, index: usize) -> bool {
        self.0[index] == *element
    }
}

/// Shell-style glob over a whole string: `*` matches any run of characters,
/// `?` exactly one.
pub fn string_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let mut input = CharInput(input.chars().collect());
    generic_match(MatchMode::Whole, &pattern, &mut input)
}

/// Whether `pattern` contains no glob wildcards and can be compared with
/// plain string equality.
pub fn is_simple_pattern(pattern: &str) -> bool {
    !pattern.contains(['*', '?'])
}
