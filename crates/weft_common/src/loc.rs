//! Host-program source locations attached to IR nodes in debug mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// The place in the host program that created or last rewrote a node.
///
/// Captured with `#[track_caller]` so that construction helpers record the
/// caller's file and line rather than their own.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SourceLoc {
    /// Source file path as reported by the compiler.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl SourceLoc {
    /// Creates a location from explicit parts.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// The location of the caller, following `#[track_caller]` frames.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&Location<'_>> for SourceLoc {
    fn from(loc: &Location<'_>) -> Self {
        Self::new(loc.file(), loc.line(), loc.column())
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
