//! Stable diagnostic codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who has to act on a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// The host program asked for an invalid construction. Prefix `E`.
    Error,
    /// The graph was already inconsistent; a bug in the core or a collaborator. Prefix `B`.
    Bug,
}

/// A category plus a number, rendered as `E100`, `B001`, ...
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Who has to act on it.
    pub category: Category,
    /// Number within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Whether the code reports a broken invariant rather than bad input.
    pub fn is_bug(self) -> bool {
        self.category == Category::Bug
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.category {
            Category::Error => 'E',
            Category::Bug => 'B',
        };
        write!(f, "{prefix}{:03}", self.number)
    }
}
