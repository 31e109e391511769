//! Vigil contexts - interned call stacks
//!
//! This crate owns the lowest layer of the diagnostic core:
//! - `Addr` and `ThreadId` newtypes for the instrumented program
//! - `Context`: an immutable, hash-consed call stack with a canonical id
//! - `ContextStore`: the resizable table that interns contexts
//! - `Unwinder` and `Symbolizer`: the collaborator traits that produce raw
//!   stacks and turn addresses back into names
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: two equal stacks are the same `&'static Context`,
//!   so the exact comparison is a pointer comparison.
//! - **Never Free**: contexts live for the whole run. They are leaked on
//!   creation, the same way interned strings are.

mod addr;
mod context;
mod store;
mod symbols;

pub use addr::{Addr, ThreadId};
pub use context::{Context, ContextId, Resolution};
pub use store::{ContextStats, ContextStore, MAX_BACKTRACE_DEPTH};
pub use symbols::{InlineFrame, InlineFrames, Symbolizer, Unwinder};
