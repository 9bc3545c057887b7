//! WeftIR: an in-memory graph of synchronous hardware built from a host program.
//!
//! Every node lives in a single [`Context`] and is addressed by a copyable id:
//! values ([`VarId`]), statements ([`StmtId`]) and owning scopes ([`ScopeId`]).
//! Expressions, slices, concatenations and casts are memoized, so building the
//! same thing twice yields the same node. Assignments keep a bidirectional
//! record of which statements drive and read each declared value, and that
//! record is what the rewiring operations ([`Context::move_src_to`],
//! [`Context::move_sink_to`]) rely on.

#![warn(missing_docs)]

pub mod arena;
pub mod constant;
pub mod context;
mod deps;
pub mod error;
pub mod expr;
pub mod function;
pub mod ids;
pub mod instance;
pub mod keywords;
mod naming;
mod rewire;
pub mod scope;
pub mod slice;
pub mod stmt;
pub mod var;

pub use arena::{Arena, ArenaId};
pub use constant::{check_const_range, EnumDef, ParamData};
pub use context::Context;
pub use error::{IrError, IrResult};
pub use expr::{CastKind, ExprOp};
pub use function::FunctionDef;
pub use ids::{EnumId, ScopeId, StmtId, StructId, VarId};
pub use instance::InstanceStmt;
pub use keywords::is_sv_keyword;
pub use scope::Scope;
pub use slice::{SliceData, SliceKey};
pub use stmt::{
    AssignStmt, AssignmentType, BlockEdge, BlockKind, BlockType, IfStmt, StatementType, Stmt,
    StmtBlock, StmtKind, StmtParent, SwitchCase, SwitchStmt,
};
pub use var::{PortDirection, StructDef, StructMember, Var, VarDecl, VarKind, VarType};
