//! IR construction errors and their diagnostic codes.
//!
//! `E100`--`E102` cover failures the host program can fix (bad widths, illegal
//! assignments, reserved names). `B001` flags a broken graph invariant.

use crate::context::Context;
use crate::ids::{StmtId, VarId};
use weft_common::InternalError;
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};

/// Value-level violation (width, sign, bounds, assignability).
pub const E100: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 100,
};

/// Statement-level violation (unconnected call port, bad instantiation).
pub const E101: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 101,
};

/// Configuration error not tied to a node (keyword name, duplicate name).
pub const E102: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 102,
};

/// Broken internal invariant.
pub const B001: DiagnosticCode = DiagnosticCode {
    category: Category::Bug,
    number: 1,
};

/// Errors raised while building or rewiring the IR.
///
/// None of the operations that return this roll back mutations they already
/// applied; a failed construction must be treated as having produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    /// A value-level violation carrying the offending nodes.
    #[error("{message}")]
    Var {
        /// Human-readable description.
        message: String,
        /// The nodes involved, most relevant first.
        nodes: Vec<VarId>,
    },

    /// A statement-level violation carrying the offending statements.
    #[error("{message}")]
    Stmt {
        /// Human-readable description.
        message: String,
        /// The statements involved.
        stmts: Vec<StmtId>,
    },

    /// A configuration error not tied to a specific node.
    #[error("{0}")]
    User(String),

    /// An invariant of the graph was already broken before the call.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Result alias used by every fallible IR operation.
pub type IrResult<T> = Result<T, IrError>;

impl IrError {
    pub(crate) fn var(message: impl Into<String>, nodes: impl Into<Vec<VarId>>) -> Self {
        IrError::Var {
            message: message.into(),
            nodes: nodes.into(),
        }
    }

    pub(crate) fn stmt(message: impl Into<String>, stmts: impl Into<Vec<StmtId>>) -> Self {
        IrError::Stmt {
            message: message.into(),
            stmts: stmts.into(),
        }
    }

    pub(crate) fn user(message: impl Into<String>) -> Self {
        IrError::User(message.into())
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        IrError::Internal(InternalError::new(message))
    }

    /// The stable diagnostic code for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            IrError::Var { .. } => E100,
            IrError::Stmt { .. } => E101,
            IrError::User(_) => E102,
            IrError::Internal(_) => B001,
        }
    }

    /// Converts the error into a [`Diagnostic`] with one label per offending
    /// node, carrying the locations recorded on that node.
    pub fn to_diagnostic(&self, ctx: &Context) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            IrError::Var { nodes, .. } => {
                nodes.iter().enumerate().fold(diag, |diag, (i, &id)| {
                    let locs = ctx.var(id).locs.clone();
                    let message = format!("`{}`", ctx.to_string(id));
                    diag.with_label(if i == 0 {
                        Label::primary(locs, message)
                    } else {
                        Label::secondary(locs, message)
                    })
                })
            }
            IrError::Stmt { stmts, .. } => {
                stmts.iter().enumerate().fold(diag, |diag, (i, &id)| {
                    let stmt = ctx.stmt(id);
                    let message = format!("{} statement", stmt.stmt_type());
                    diag.with_label(if i == 0 {
                        Label::primary(stmt.locs.clone(), message)
                    } else {
                        Label::secondary(stmt.locs.clone(), message)
                    })
                })
            }
            IrError::User(_) => diag,
            IrError::Internal(_) => {
                diag.with_note("the IR graph was already inconsistent before this call")
            }
        }
    }
}
