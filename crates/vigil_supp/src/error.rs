//! Suppression loading errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load a suppressions file.
///
/// Any of these aborts loading of the whole file: either every record of a
/// file is accepted or none is.
#[derive(Debug, Error)]
pub enum SuppError {
    #[error("cannot read suppressions file \"{}\": {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("suppressions file \"{}\" is a directory", .path.display())]
    IsDirectory { path: PathBuf },

    #[error("in suppressions file \"{source_name}\" near line {line}:\n   {message}")]
    Syntax {
        source_name: String,
        line: usize,
        message: String,
    },
}

impl SuppError {
    /// Line the error was detected on, for syntax errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            SuppError::Syntax { line, .. } => Some(*line),
            SuppError::Io { .. } | SuppError::IsDirectory { .. } => None,
        }
    }
}
