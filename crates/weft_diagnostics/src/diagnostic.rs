//! Structured diagnostic messages and their plain-text rendering.

use crate::code::DiagnosticCode;
use crate::label::{Label, LabelStyle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rejected construction: code, message and the nodes involved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code identifying the kind of failure.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// The nodes involved, primary first.
    pub labels: Vec<Label>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic without labels.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The first primary label, if any.
    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.iter().find(|l| l.style == LabelStyle::Primary)
    }
}

/// Renders in a rustc-like layout:
///
/// ```text
/// error[E100]: left (a) width (4) doesn't match with right (b) width (8)
///   --> src/top.rs:12:9 `a`
///   - `b`
///    = note: ...
/// ```
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = if self.code.is_bug() { "bug" } else { "error" };
        writeln!(f, "{head}[{}]: {}", self.code, self.message)?;
        for label in &self.labels {
            let arrow = match label.style {
                LabelStyle::Primary => "-->",
                LabelStyle::Secondary => "-",
            };
            match label.locations.first() {
                Some(loc) => writeln!(f, "  {arrow} {loc} {}", label.message)?,
                None => writeln!(f, "  {arrow} {}", label.message)?,
            }
            for loc in label.locations.iter().skip(1) {
                writeln!(f, "      also at {loc}")?;
            }
        }
        for note in &self.notes {
            writeln!(f, "   = note: {note}")?;
        }
        Ok(())
    }
}
