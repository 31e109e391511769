//! Error events and the records they are deduplicated into.

use std::fmt;

use vigil_context::{Addr, Context, ThreadId};
use vigil_supp::SuppId;

use crate::Tool;

/// Index of an [`ErrorRecord`] in its [`ErrorCatalog`](crate::ErrorCatalog).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ErrorId(u32);

impl ErrorId {
    pub(crate) fn new(index: usize) -> Self {
        ErrorId(u32::try_from(index).unwrap_or_else(|_| panic!("error catalog overflow")))
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorId({})", self.0)
    }
}

/// What happened to a record when it was first seen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorState {
    /// Handed to the report sink.
    Reported,
    /// Hidden by a suppression.
    Suppressed,
    /// Counted but not reported: the shown-errors cutoff had tripped.
    Unshown,
}

/// One detection, as the tool raises it.
///
/// The message and payload are borrowed; the catalog only copies them when
/// the event turns out to be new.
pub struct ErrorEvent<'a, T: Tool> {
    pub thread: ThreadId,
    pub kind: T::Kind,
    pub addr: Option<Addr>,
    pub message: Option<&'a str>,
    pub extra: &'a T::Extra,
}

impl<'a, T: Tool> ErrorEvent<'a, T> {
    pub fn new(thread: ThreadId, kind: T::Kind, extra: &'a T::Extra) -> Self {
        ErrorEvent {
            thread,
            kind,
            addr: None,
            message: None,
            extra,
        }
    }

    /// Set the faulting address.
    #[must_use]
    pub fn at(mut self, addr: Addr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Set the short description.
    #[must_use]
    pub fn with_message(mut self, message: &'a str) -> Self {
        self.message = Some(message);
        self
    }
}

/// A deduplicated error: one kind of problem at one context.
pub struct ErrorRecord<T: Tool> {
    pub(crate) unique: u32,
    pub(crate) kind: T::Kind,
    pub(crate) thread: ThreadId,
    pub(crate) addr: Option<Addr>,
    pub(crate) message: Option<String>,
    pub(crate) extra: T::Extra,
    pub(crate) context: &'static Context,
    pub(crate) count: u64,
    pub(crate) supp: Option<SuppId>,
    pub(crate) state: ErrorState,
}

impl<T: Tool> ErrorRecord<T> {
    /// Copy `event` into a new record seen once.
    pub(crate) fn from_event(unique: u32, context: &'static Context, event: &ErrorEvent<'_, T>) -> Self {
        ErrorRecord {
            unique,
            kind: event.kind,
            thread: event.thread,
            addr: event.addr,
            message: event.message.map(str::to_owned),
            extra: event.extra.clone(),
            context,
            count: 1,
            supp: None,
            state: ErrorState::Reported,
        }
    }

    /// Number assigned at creation, unique over the run.
    #[inline]
    pub fn unique(&self) -> u32 {
        self.unique
    }

    #[inline]
    pub fn kind(&self) -> T::Kind {
        self.kind
    }

    /// Thread of the first occurrence.
    #[inline]
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    #[inline]
    pub fn addr(&self) -> Option<Addr> {
        self.addr
    }

    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn extra(&self) -> &T::Extra {
        &self.extra
    }

    /// Tool payload, for [`Tool::update_extra`].
    #[inline]
    pub fn extra_mut(&mut self) -> &mut T::Extra {
        &mut self.extra
    }

    #[inline]
    pub fn context(&self) -> &'static Context {
        self.context
    }

    /// Occurrences, the first one included.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The suppression that hid this record.
    #[inline]
    pub fn suppression(&self) -> Option<SuppId> {
        self.supp
    }

    #[inline]
    pub fn state(&self) -> ErrorState {
        self.state
    }

    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.supp.is_some()
    }
}

impl<T: Tool> fmt::Debug for ErrorRecord<T>
where
    T::Extra: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecord")
            .field("unique", &self.unique)
            .field("kind", &self.kind)
            .field("thread", &self.thread)
            .field("addr", &self.addr)
            .field("message", &self.message)
            .field("extra", &self.extra)
            .field("context", &self.context.id())
            .field("count", &self.count)
            .field("supp", &self.supp)
            .field("state", &self.state)
            .finish()
    }
}
