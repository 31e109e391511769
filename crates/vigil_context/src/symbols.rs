//! Collaborator traits: stack capture and symbolization.
//!
//! The diagnostic core never walks stacks or reads debug info itself. The
//! embedding framework supplies an [`Unwinder`] and a [`Symbolizer`].

use crate::{Addr, ThreadId};

/// Produces raw return-address sequences for a point of execution.
pub trait Unwinder {
    /// Capture at most `max_depth` frames of `thread`'s stack, innermost
    /// first, skipping the `skip_frames` innermost ones.
    fn capture(&self, thread: ThreadId, skip_frames: usize, max_depth: usize) -> Vec<Addr>;
}

/// One logical call frame at an address.
///
/// An address inside inlined code stands for several logical frames: the
/// inlined callee(s) first, then the function they were inlined into. Each
/// of them is one `InlineFrame`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineFrame {
    /// The raw address this frame was expanded from.
    pub addr: Addr,
    /// Function name at this inline depth, if the symbolizer already knows
    /// it. `None` defers to [`Symbolizer::function_name`].
    pub function: Option<String>,
}

impl InlineFrame {
    /// A frame with no inline information: the raw address is the frame.
    pub fn raw(addr: Addr) -> Self {
        InlineFrame {
            addr,
            function: None,
        }
    }

    /// A frame whose function name is known up front.
    pub fn named(addr: Addr, function: impl Into<String>) -> Self {
        InlineFrame {
            addr,
            function: Some(function.into()),
        }
    }
}

/// Lazy, finite sequence of inline frames for one address.
pub type InlineFrames<'a> = Box<dyn Iterator<Item = InlineFrame> + 'a>;

/// Turns addresses into names.
///
/// Lookups may be expensive (debug info parsing, demangling); callers cache
/// what they need and only ask for names they are about to use.
pub trait Symbolizer {
    /// Name of the function containing `addr`.
    fn function_name(&self, addr: Addr) -> Option<String>;

    /// Name of the object (executable or shared library) containing `addr`.
    fn object_name(&self, addr: Addr) -> Option<String>;

    /// Expand `addr` into its logical frames, innermost first.
    ///
    /// The default has no inline information and yields the address itself.
    fn inline_frames(&self, addr: Addr) -> InlineFrames<'_> {
        Box::new(std::iter::once(InlineFrame::raw(addr)))
    }
}

impl<S: Symbolizer + ?Sized> Symbolizer for &S {
    fn function_name(&self, addr: Addr) -> Option<String> {
        (**self).function_name(addr)
    }

    fn object_name(&self, addr: Addr) -> Option<String> {
        (**self).object_name(addr)
    }

    fn inline_frames(&self, addr: Addr) -> InlineFrames<'_> {
        (**self).inline_frames(addr)
    }
}
