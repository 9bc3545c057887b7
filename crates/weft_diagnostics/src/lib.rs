//! Structured diagnostics for IR construction failures.
//!
//! A [`Diagnostic`] is the hand-off format between the IR core, which knows
//! which nodes were involved in a failure, and whatever front end renders the
//! host-program source around them. Each diagnostic has a stable
//! [`DiagnosticCode`] and one [`Label`] per offending node, and renders as
//! plain text through `Display`.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
