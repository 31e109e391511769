//! Suppressions: user rules that hide known errors.
//!
//! A suppressions file holds records like:
//!
//! ```text
//! # Known leak in the system resolver.
//! {
//!    resolver-leak
//!    Memcheck,Helgrind:Leak
//!    fun:malloc
//!    ...
//!    obj:/usr/lib/libresolv*.so*
//! }
//! ```
//!
//! The second line names the tools the rule applies to and the
//! tool-defined error kind. Tools may read extra lines after it; the rest
//! are location lines, innermost frame first. Records for other tools are
//! skipped whole.

mod catalog;
mod error;
mod parser;
mod pattern;

pub use catalog::{SuppId, Suppression, SuppressionCatalog};
pub use error::SuppError;
pub use parser::{SuppLines, SuppressionSyntax, MAX_LOCATION_LINES};
pub use pattern::{LocPattern, NameKind, NamePattern};
