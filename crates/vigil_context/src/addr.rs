//! Address and thread identifiers of the instrumented program.

use std::fmt;

/// A code or data address in the instrumented program.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Addr(u64);

impl Addr {
    /// The zero address, used by the sentinel context.
    pub const NULL: Addr = Addr(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Addr(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for Addr {
    fn from(raw: u64) -> Self {
        Addr(raw)
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({:#x})", self.0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Identifier of a thread in the instrumented program.
///
/// Thread ids start at 1; 0 is never a live thread.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    /// The main thread.
    pub const MAIN: ThreadId = ThreadId(1);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        ThreadId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
