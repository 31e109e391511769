//! Interned call-stack contexts.

use std::fmt;

use crate::Addr;

/// Canonical identifier of an interned [`Context`].
///
/// Ids are handed out in steps of [`ContextId::STRIDE`] starting at
/// `STRIDE`, so the low bits of an id are always zero. Encodings that pack
/// several id spaces into one integer rely on this to tell context ids
/// apart from the others.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ContextId(u32);

impl ContextId {
    /// Distance between two consecutive ids.
    pub const STRIDE: u32 = 4;

    /// Id of the sentinel context, always the first one allocated.
    pub const SENTINEL: ContextId = ContextId(Self::STRIDE);

    /// Rebuild an id from its raw value, e.g. one read back from a log.
    ///
    /// The id is not checked; use [`ContextStore::is_plausible_id`](crate::ContextStore::is_plausible_id)
    /// before trusting it.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ContextId(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The id following this one, or `None` once the id space is exhausted.
    #[inline]
    pub(crate) fn next(self) -> Option<ContextId> {
        self.0.checked_add(Self::STRIDE).map(ContextId)
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Precision used when comparing two contexts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resolution {
    /// Compare the innermost 2 frames.
    Coarse,
    /// Compare the innermost 4 frames.
    Medium,
    /// Same interned context.
    Exact,
}

impl Resolution {
    /// Number of innermost frames examined, `None` for [`Resolution::Exact`].
    pub const fn depth(self) -> Option<usize> {
        match self {
            Resolution::Coarse => Some(2),
            Resolution::Medium => Some(4),
            Resolution::Exact => None,
        }
    }
}

/// An interned call stack.
///
/// Frame 0 is the innermost frame (where the event happened); the last frame
/// is the outermost caller. Contexts are only created by a
/// [`ContextStore`](crate::ContextStore), which guarantees that two contexts
/// with equal frames are the same object.
pub struct Context {
    id: ContextId,
    frames: Box<[Addr]>,
}

impl Context {
    pub(crate) fn new(id: ContextId, frames: Box<[Addr]>) -> Self {
        debug_assert!(!frames.is_empty(), "contexts have at least one frame");
        Context { id, frames }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The frame addresses, innermost first.
    #[inline]
    pub fn frames(&self) -> &[Addr] {
        &self.frames
    }

    /// Number of frames (always at least 1).
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame address.
    #[inline]
    pub fn top(&self) -> Addr {
        self.frames[0]
    }

    /// Compare two contexts at the given resolution.
    ///
    /// `Coarse` and `Medium` compare the innermost 2 or 4 frames; when one
    /// context is shorter than that, only the frames both contexts have are
    /// compared. `Exact` is identity, which for interned contexts is the
    /// same as frame-by-frame equality.
    pub fn equal(a: &Context, b: &Context, resolution: Resolution) -> bool {
        match resolution.depth() {
            Some(depth) => a
                .frames
                .iter()
                .zip(b.frames.iter())
                .take(depth)
                .all(|(x, y)| x == y),
            None => std::ptr::eq(a, b),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("frames", &self.frames)
            .finish()
    }
}
