//! The statement tree: assignments, conditionals, switches and blocks.
//!
//! Statements are allocated free-standing and later attached to a scope or a
//! parent statement. Attaching an assignment is what registers its source and
//! sink edges, so an assignment that is built but never added leaves the
//! graph untouched.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::function::FunctionDef;
use crate::ids::{ScopeId, StmtId, VarId};
use crate::instance::InstanceStmt;
use crate::var::VarKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use weft_common::SourceLoc;

/// Where a statement is attached.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StmtParent {
    /// A top-level statement of a scope.
    Scope(ScopeId),
    /// A child of another statement.
    Stmt(StmtId),
}

/// Blocking or non-blocking assignment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AssignmentType {
    /// `=`.
    Blocking,
    /// `<=`.
    NonBlocking,
    /// Decided by the enclosing block.
    Undefined,
}

/// Trigger edge of a sequential block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BlockEdge {
    /// `posedge`.
    Posedge,
    /// `negedge`.
    Negedge,
}

/// Coarse statement classification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum StatementType {
    /// Assignment.
    Assign,
    /// If/else.
    If,
    /// Switch/case.
    Switch,
    /// Statement block.
    Block,
    /// Function call used as a statement.
    FunctionCall,
    /// Return from a function.
    Return,
    /// Module instantiation.
    ModuleInstantiation,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementType::Assign => "assignment",
            StatementType::If => "if",
            StatementType::Switch => "switch",
            StatementType::Block => "block",
            StatementType::FunctionCall => "function call",
            StatementType::Return => "return",
            StatementType::ModuleInstantiation => "module instantiation",
        })
    }
}

/// Block classification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BlockType {
    /// `always_comb`.
    Combinational,
    /// `always_ff` with a trigger list.
    Sequential,
    /// `begin ... end`.
    Scoped,
    /// Function body.
    Function,
}

/// `left = right`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AssignStmt {
    /// Driven value.
    pub left: VarId,
    /// Read value.
    pub right: VarId,
    /// Blocking, non-blocking, or not yet decided.
    pub assign_type: AssignmentType,
}

/// `if (predicate) then_body else else_body`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct IfStmt {
    /// 1-bit condition.
    pub predicate: VarId,
    /// Scoped block taken when the predicate holds.
    pub then_body: StmtId,
    /// Scoped block taken otherwise.
    pub else_body: StmtId,
}

/// A switch case label; `Default` sorts after every constant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum SwitchCase {
    /// A constant label.
    Case(VarId),
    /// The default case.
    Default,
}

/// `case (target)`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SwitchStmt {
    /// Switched value.
    pub target: VarId,
    /// Scoped block per case.
    pub cases: BTreeMap<SwitchCase, StmtId>,
}

/// What kind of block a [`StmtBlock`] is.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BlockKind {
    /// `always_comb`.
    Combinational,
    /// `always_ff @(...)`.
    Sequential {
        /// Trigger list in declaration order.
        conditions: Vec<(BlockEdge, VarId)>,
    },
    /// `begin ... end`.
    Scoped,
    /// A function body.
    Function(Box<FunctionDef>),
}

/// An ordered statement container.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StmtBlock {
    /// Block kind.
    pub kind: BlockKind,
    /// Children in insertion order.
    pub stmts: Vec<StmtId>,
}

impl StmtBlock {
    /// Coarse block classification.
    pub fn block_type(&self) -> BlockType {
        match self.kind {
            BlockKind::Combinational => BlockType::Combinational,
            BlockKind::Sequential { .. } => BlockType::Sequential,
            BlockKind::Scoped => BlockType::Scoped,
            BlockKind::Function(_) => BlockType::Function,
        }
    }
}

/// What a statement is.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StmtKind {
    /// Assignment.
    Assign(AssignStmt),
    /// If/else.
    If(IfStmt),
    /// Switch/case.
    Switch(SwitchStmt),
    /// Statement block.
    Block(StmtBlock),
    /// A function call whose result is discarded.
    FunctionCall {
        /// The called function block.
        func: StmtId,
        /// The call value.
        var: VarId,
    },
    /// `return value`.
    Return {
        /// The enclosing function block.
        func: StmtId,
        /// Returned value.
        value: VarId,
    },
    /// Module instantiation.
    ModuleInstantiation(InstanceStmt),
}

/// A statement node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stmt {
    /// What this statement is.
    pub kind: StmtKind,
    /// Where the statement is attached.
    pub parent: Option<StmtParent>,
    /// Host-program locations recorded in debug mode.
    pub locs: Vec<SourceLoc>,
}

impl Stmt {
    pub(crate) fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            parent: None,
            locs: Vec::new(),
        }
    }

    /// Coarse classification.
    pub fn stmt_type(&self) -> StatementType {
        match self.kind {
            StmtKind::Assign(_) => StatementType::Assign,
            StmtKind::If(_) => StatementType::If,
            StmtKind::Switch(_) => StatementType::Switch,
            StmtKind::Block(_) => StatementType::Block,
            StmtKind::FunctionCall { .. } => StatementType::FunctionCall,
            StmtKind::Return { .. } => StatementType::Return,
            StmtKind::ModuleInstantiation(_) => StatementType::ModuleInstantiation,
        }
    }

    /// The assignment, if this is one.
    pub fn as_assign(&self) -> Option<&AssignStmt> {
        match &self.kind {
            StmtKind::Assign(assign) => Some(assign),
            _ => None,
        }
    }

    /// The block, if this is one.
    pub fn as_block(&self) -> Option<&StmtBlock> {
        match &self.kind {
            StmtKind::Block(block) => Some(block),
            _ => None,
        }
    }
}

impl Context {
    #[track_caller]
    pub(crate) fn alloc_stmt(&mut self, kind: StmtKind, loc_scope: ScopeId) -> StmtId {
        let mut stmt = Stmt::new(kind);
        stmt.locs.extend(self.caller_loc(loc_scope));
        self.stmts.alloc(stmt)
    }

    /// Builds `left = right`. Edges are registered once the assignment is
    /// attached to a scope or block.
    #[track_caller]
    pub fn assign(
        &mut self,
        left: VarId,
        right: VarId,
        assign_type: AssignmentType,
    ) -> IrResult<StmtId> {
        let (l, r) = (&self.vars[left], &self.vars[right]);
        match l.kind {
            VarKind::Const { .. } | VarKind::EnumConst { .. } | VarKind::Param(_) => {
                return Err(IrError::var(
                    format!(
                        "Cannot assign {} to a const {}",
                        self.to_string(right),
                        self.to_string(left)
                    ),
                    vec![left, right],
                ));
            }
            VarKind::Cast { .. } => {
                return Err(IrError::var(
                    format!("{} is not allowed to be a sink", self.to_string(left)),
                    vec![left, right],
                ));
            }
            VarKind::Expr { .. }
            | VarKind::Conditional { .. }
            | VarKind::Extend { .. }
            | VarKind::FunctionCall { .. } => {
                return Err(IrError::var(
                    format!("Cannot assign {} to an expression", self.to_string(right)),
                    vec![left, right],
                ));
            }
            VarKind::EnumVar { def } => match r.enum_def() {
                None => {
                    return Err(IrError::var(
                        "Cannot assign enum type to non enum type",
                        vec![left, right],
                    ))
                }
                Some(other) if other != def => {
                    return Err(IrError::var(
                        "Cannot assign different enum type",
                        vec![left, right],
                    ))
                }
                Some(_) => {}
            },
            _ => {}
        }
        if l.width() != r.width() {
            return Err(IrError::var(
                format!(
                    "left ({}) width ({}) doesn't match with right ({}) width ({})",
                    self.to_string(left),
                    l.width(),
                    self.to_string(right),
                    r.width()
                ),
                vec![left, right],
            ));
        }
        let exempt = matches!(r.kind, VarKind::Const { .. } | VarKind::Param(_));
        if l.signed != r.signed && !exempt {
            let (signed, unsigned) = if l.signed { (left, right) } else { (right, left) };
            return Err(IrError::var(
                format!(
                    "{} is signed but {} is not",
                    self.to_string(signed),
                    self.to_string(unsigned)
                ),
                vec![left, right],
            ));
        }
        let scope = l.scope;
        Ok(self.alloc_stmt(
            StmtKind::Assign(AssignStmt {
                left,
                right,
                assign_type,
            }),
            scope,
        ))
    }

    /// Attaches `child` under `parent` and registers an assignment's edges.
    pub(crate) fn attach(&mut self, child: StmtId, parent: StmtParent) -> IrResult<()> {
        if self.stmts[child].parent.is_some() {
            return Err(IrError::stmt(
                format!("{} statement already has a parent", self.stmts[child].stmt_type()),
                vec![child],
            ));
        }
        if let Some(assign) = self.stmts[child].as_assign() {
            let (left, right) = (assign.left, assign.right);
            if let Err(err) = self.add_source(left, child) {
                self.remove_source(left, child);
                return Err(err);
            }
            if let Err(err) = self.add_sink(right, child) {
                self.remove_source(left, child);
                self.remove_sink(right, child);
                return Err(err);
            }
        }
        self.stmts[child].parent = Some(parent);
        Ok(())
    }

    /// Removes an assignment's edges and detaches it from its owner.
    pub fn unassign(&mut self, stmt: StmtId) -> IrResult<()> {
        let Some(assign) = self.stmts[stmt].as_assign() else {
            return Err(IrError::stmt(
                format!("Cannot unassign a {} statement", self.stmts[stmt].stmt_type()),
                vec![stmt],
            ));
        };
        let (left, right) = (assign.left, assign.right);
        self.remove_source(left, stmt);
        self.remove_sink(right, stmt);
        match self.stmts[stmt].parent {
            Some(StmtParent::Scope(scope)) => self.remove_stmt(scope, stmt),
            Some(StmtParent::Stmt(block)) => self.block_remove_stmt(block, stmt),
            None => Ok(()),
        }
    }

    /// The scope that (transitively) owns `stmt`.
    pub fn stmt_scope(&self, stmt: StmtId) -> Option<ScopeId> {
        let mut current = stmt;
        loop {
            match self.stmts[current].parent? {
                StmtParent::Scope(scope) => return Some(scope),
                StmtParent::Stmt(parent) => current = parent,
            }
        }
    }

    #[track_caller]
    fn new_block(&mut self, kind: BlockKind, loc_scope: ScopeId) -> StmtId {
        self.alloc_stmt(
            StmtKind::Block(StmtBlock {
                kind,
                stmts: Vec::new(),
            }),
            loc_scope,
        )
    }

    /// Adds an `always_comb` block to `scope`.
    #[track_caller]
    pub fn comb_block(&mut self, scope: ScopeId) -> IrResult<StmtId> {
        let block = self.new_block(BlockKind::Combinational, scope);
        self.add_stmt(scope, block)?;
        Ok(block)
    }

    /// Adds an `always_ff` block triggered by `conditions` to `scope`.
    #[track_caller]
    pub fn seq_block(
        &mut self,
        scope: ScopeId,
        conditions: &[(BlockEdge, VarId)],
    ) -> IrResult<StmtId> {
        let block = self.new_block(
            BlockKind::Sequential {
                conditions: conditions.to_vec(),
            },
            scope,
        );
        self.add_stmt(scope, block)?;
        Ok(block)
    }

    /// Appends a trigger to a sequential block.
    pub fn add_condition(&mut self, block: StmtId, edge: BlockEdge, var: VarId) -> IrResult<()> {
        match &mut self.stmts[block].kind {
            StmtKind::Block(StmtBlock {
                kind: BlockKind::Sequential { conditions },
                ..
            }) => {
                conditions.push((edge, var));
                Ok(())
            }
            _ => Err(IrError::stmt("Only sequential blocks have triggers", vec![block])),
        }
    }

    /// A free-standing `begin ... end` block.
    #[track_caller]
    pub fn scoped_block(&mut self, scope: ScopeId) -> StmtId {
        self.new_block(BlockKind::Scoped, scope)
    }

    fn block_mut(&mut self, block: StmtId) -> IrResult<&mut StmtBlock> {
        match &mut self.stmts[block].kind {
            StmtKind::Block(b) => Ok(b),
            _ => Err(IrError::stmt("statement is not a block", vec![block])),
        }
    }

    /// Appends `stmt` to `block`. Assignments with an undecided type pick it
    /// up from the nearest enclosing combinational or sequential block.
    pub fn block_add_stmt(&mut self, block: StmtId, stmt: StmtId) -> IrResult<()> {
        self.block_mut(block)?;
        if stmt == block {
            return Err(IrError::stmt(
                "block cannot be added to itself",
                vec![stmt, block],
            ));
        }
        if self.encloses(stmt, block) {
            return Err(IrError::stmt(
                format!(
                    "{} statement already encloses the block it is added to",
                    self.stmts[stmt].stmt_type()
                ),
                vec![stmt, block],
            ));
        }
        if let Some(child) = self.stmts[stmt].as_block() {
            if child.block_type() != BlockType::Scoped {
                return Err(IrError::stmt(
                    format!("{:?} block cannot be nested in another block", child.block_type()),
                    vec![stmt, block],
                ));
            }
        }
        self.attach(stmt, StmtParent::Stmt(block))?;
        self.block_mut(block)?.stmts.push(stmt);
        if let Some(assign_type) = self.default_assign_type(block) {
            self.apply_assign_type(stmt, assign_type);
        }
        Ok(())
    }

    /// Whether `outer` is one of the statements `inner` is nested in.
    fn encloses(&self, outer: StmtId, inner: StmtId) -> bool {
        let mut current = inner;
        while let Some(StmtParent::Stmt(parent)) = self.stmts[current].parent {
            if parent == outer {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Removes `stmt` from `block`, leaving its edges in place.
    pub fn block_remove_stmt(&mut self, block: StmtId, stmt: StmtId) -> IrResult<()> {
        let stmts = &mut self.block_mut(block)?.stmts;
        let before = stmts.len();
        stmts.retain(|&s| s != stmt);
        if stmts.len() == before {
            return Err(IrError::stmt(
                "statement does not belong to this block",
                vec![stmt, block],
            ));
        }
        self.stmts[stmt].parent = None;
        Ok(())
    }

    fn default_assign_type(&self, block: StmtId) -> Option<AssignmentType> {
        let mut current = block;
        loop {
            if let Some(b) = self.stmts[current].as_block() {
                match b.kind {
                    BlockKind::Combinational => return Some(AssignmentType::Blocking),
                    BlockKind::Sequential { .. } => return Some(AssignmentType::NonBlocking),
                    BlockKind::Scoped | BlockKind::Function(_) => {}
                }
            }
            match self.stmts[current].parent? {
                StmtParent::Stmt(parent) => current = parent,
                StmtParent::Scope(_) => return None,
            }
        }
    }

    fn apply_assign_type(&mut self, stmt: StmtId, assign_type: AssignmentType) {
        let children: Vec<StmtId> = match &mut self.stmts[stmt].kind {
            StmtKind::Assign(assign) => {
                if assign.assign_type == AssignmentType::Undefined {
                    debug!("assignment {} defaults to {assign_type:?}", stmt.as_raw());
                    assign.assign_type = assign_type;
                }
                Vec::new()
            }
            StmtKind::If(if_stmt) => vec![if_stmt.then_body, if_stmt.else_body],
            StmtKind::Switch(switch) => switch.cases.values().copied().collect(),
            StmtKind::Block(block) => block.stmts.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.apply_assign_type(child, assign_type);
        }
    }

    /// `if (predicate)` with empty then/else bodies.
    #[track_caller]
    pub fn if_stmt(&mut self, predicate: VarId) -> IrResult<StmtId> {
        let p = &self.vars[predicate];
        if p.width() != 1 {
            return Err(IrError::var(
                format!("Predicate {} has to be 1 bit", self.to_string(predicate)),
                vec![predicate],
            ));
        }
        let scope = p.scope;
        let then_body = self.scoped_block(scope);
        let else_body = self.scoped_block(scope);
        let stmt = self.alloc_stmt(
            StmtKind::If(IfStmt {
                predicate,
                then_body,
                else_body,
            }),
            scope,
        );
        self.attach(then_body, StmtParent::Stmt(stmt))?;
        self.attach(else_body, StmtParent::Stmt(stmt))?;
        Ok(stmt)
    }

    fn if_bodies(&self, stmt: StmtId) -> IrResult<(StmtId, StmtId)> {
        match &self.stmts[stmt].kind {
            StmtKind::If(s) => Ok((s.then_body, s.else_body)),
            _ => Err(IrError::stmt("statement is not an if statement", vec![stmt])),
        }
    }

    /// Appends to the then branch.
    pub fn add_then_stmt(&mut self, if_stmt: StmtId, stmt: StmtId) -> IrResult<()> {
        let (then_body, _) = self.if_bodies(if_stmt)?;
        self.block_add_stmt(then_body, stmt)
    }

    /// Appends to the else branch.
    pub fn add_else_stmt(&mut self, if_stmt: StmtId, stmt: StmtId) -> IrResult<()> {
        let (_, else_body) = self.if_bodies(if_stmt)?;
        self.block_add_stmt(else_body, stmt)
    }

    /// Removes from the then branch.
    pub fn remove_then_stmt(&mut self, if_stmt: StmtId, stmt: StmtId) -> IrResult<()> {
        let (then_body, _) = self.if_bodies(if_stmt)?;
        self.block_remove_stmt(then_body, stmt)
    }

    /// Removes from the else branch.
    pub fn remove_else_stmt(&mut self, if_stmt: StmtId, stmt: StmtId) -> IrResult<()> {
        let (_, else_body) = self.if_bodies(if_stmt)?;
        self.block_remove_stmt(else_body, stmt)
    }

    /// `case (target)` with no cases.
    #[track_caller]
    pub fn switch_stmt(&mut self, target: VarId) -> StmtId {
        let scope = self.vars[target].scope;
        self.alloc_stmt(
            StmtKind::Switch(SwitchStmt {
                target,
                cases: BTreeMap::new(),
            }),
            scope,
        )
    }

    fn switch_mut(&mut self, stmt: StmtId) -> IrResult<&mut SwitchStmt> {
        match &mut self.stmts[stmt].kind {
            StmtKind::Switch(s) => Ok(s),
            _ => Err(IrError::stmt("statement is not a switch statement", vec![stmt])),
        }
    }

    fn switch_key(&self, case: Option<VarId>) -> IrResult<SwitchCase> {
        match case {
            None => Ok(SwitchCase::Default),
            Some(c) if self.vars[c].is_const() => Ok(SwitchCase::Case(c)),
            Some(c) => Err(IrError::var(
                format!("Switch case {} has to be a constant", self.to_string(c)),
                vec![c],
            )),
        }
    }

    /// Appends `stmts` to the block of `case` (`None` is the default case),
    /// creating the block on first use. Returns the case block.
    #[track_caller]
    pub fn add_switch_case(
        &mut self,
        switch: StmtId,
        case: Option<VarId>,
        stmts: &[StmtId],
    ) -> IrResult<StmtId> {
        let key = self.switch_key(case)?;
        let existing = self.switch_mut(switch)?.cases.get(&key).copied();
        let body = match existing {
            Some(body) => body,
            None => {
                let target = self.switch_mut(switch)?.target;
                let scope = self.vars[target].scope;
                let body = self.scoped_block(scope);
                self.attach(body, StmtParent::Stmt(switch))?;
                self.switch_mut(switch)?.cases.insert(key, body);
                body
            }
        };
        for &stmt in stmts {
            self.block_add_stmt(body, stmt)?;
        }
        Ok(body)
    }

    /// Drops a whole case.
    pub fn remove_switch_case(&mut self, switch: StmtId, case: Option<VarId>) -> IrResult<()> {
        let key = self.switch_key(case)?;
        if let Some(body) = self.switch_mut(switch)?.cases.remove(&key) {
            self.stmts[body].parent = None;
        }
        Ok(())
    }

    /// Removes one statement from a case block.
    pub fn remove_switch_case_stmt(
        &mut self,
        switch: StmtId,
        case: Option<VarId>,
        stmt: StmtId,
    ) -> IrResult<()> {
        let key = self.switch_key(case)?;
        match self.switch_mut(switch)?.cases.get(&key).copied() {
            Some(body) => self.block_remove_stmt(body, stmt),
            None => Err(IrError::stmt("switch case does not exist", vec![switch])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarDecl;

    fn setup() -> (Context, ScopeId) {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        (ctx, top)
    }

    #[test]
    fn cannot_assign_to_const_or_expression() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let c = ctx.constant(1, 4, false).unwrap();
        let err = ctx.assign(c, a, AssignmentType::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign a to a const 4'h1");
        let sum = ctx.add(a, b).unwrap();
        let err = ctx.assign(sum, a, AssignmentType::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign a to an expression");
        let p = ctx.parameter(top, "P", 4, false).unwrap();
        assert!(ctx.assign(p, a, AssignmentType::Undefined).is_err());
    }

    #[test]
    fn assign_checks_width_and_sign() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let wide = ctx.declare_var(top, VarDecl::new("wide", 5)).unwrap();
        let s = ctx.declare_var(top, VarDecl::new("s", 4).signed()).unwrap();
        assert!(ctx.assign(a, wide, AssignmentType::Undefined).is_err());
        let err = ctx.assign(a, s, AssignmentType::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "s is signed but a is not");
        let c = ctx.constant(3, 4, false).unwrap();
        assert!(ctx.assign(s, c, AssignmentType::Undefined).is_ok());
    }

    #[test]
    fn enum_assignments() {
        let (mut ctx, top) = setup();
        let state_t = ctx.add_enum(top, "state_t", 2, &[("IDLE", 0), ("BUSY", 1)]).unwrap();
        let mode_t = ctx.add_enum(top, "mode_t", 2, &[("FAST", 0)]).unwrap();
        let state = ctx.declare_enum_var(top, "state", state_t).unwrap();
        let raw = ctx.declare_var(top, VarDecl::new("raw", 2)).unwrap();
        let busy = ctx.get_enum(state_t, "BUSY").unwrap();
        let fast = ctx.get_enum(mode_t, "FAST").unwrap();
        assert!(ctx.assign(state, busy, AssignmentType::Undefined).is_ok());
        let err = ctx.assign(state, raw, AssignmentType::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign enum type to non enum type");
        let err = ctx.assign(state, fast, AssignmentType::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Cannot assign different enum type");
    }

    #[test]
    fn sequential_blocks_default_to_non_blocking() {
        let (mut ctx, top) = setup();
        let clk = ctx.declare_var(top, VarDecl::new("clk", 1)).unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let seq = ctx.seq_block(top, &[(BlockEdge::Posedge, clk)]).unwrap();
        let cond = ctx.if_stmt(clk).unwrap();
        let inner = ctx.assign(a, b, AssignmentType::Undefined).unwrap();
        ctx.add_then_stmt(cond, inner).unwrap();
        ctx.block_add_stmt(seq, cond).unwrap();
        assert_eq!(
            ctx.stmt(inner).as_assign().unwrap().assign_type,
            AssignmentType::NonBlocking
        );
        assert_eq!(ctx.stmt_scope(inner), Some(top));

        let comb = ctx.comb_block(top).unwrap();
        let blocking = ctx.assign(b, a, AssignmentType::Undefined).unwrap();
        ctx.block_add_stmt(comb, blocking).unwrap();
        assert_eq!(
            ctx.stmt(blocking).as_assign().unwrap().assign_type,
            AssignmentType::Blocking
        );
    }

    #[test]
    fn process_blocks_cannot_nest() {
        let (mut ctx, top) = setup();
        let outer = ctx.comb_block(top).unwrap();
        let inner = ctx.comb_block(top).unwrap();
        assert!(ctx.block_add_stmt(outer, inner).is_err());
        let scoped = ctx.scoped_block(top);
        assert!(ctx.block_add_stmt(outer, scoped).is_ok());
    }

    #[test]
    fn if_predicate_must_be_one_bit() {
        let (mut ctx, top) = setup();
        let wide = ctx.declare_var(top, VarDecl::new("wide", 2)).unwrap();
        let err = ctx.if_stmt(wide).unwrap_err();
        assert_eq!(err.to_string(), "Predicate wide has to be 1 bit");
    }

    #[test]
    fn switch_cases() {
        let (mut ctx, top) = setup();
        let sel = ctx.declare_var(top, VarDecl::new("sel", 2)).unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let sw = ctx.switch_stmt(sel);
        let zero = ctx.constant(0, 2, false).unwrap();
        let s0 = ctx.assign(a, b, AssignmentType::Undefined).unwrap();
        let s1 = ctx.assign(b, a, AssignmentType::Undefined).unwrap();
        let body = ctx.add_switch_case(sw, Some(zero), &[s0]).unwrap();
        assert_eq!(ctx.add_switch_case(sw, Some(zero), &[s1]).unwrap(), body);
        let default = ctx.add_switch_case(sw, None, &[]).unwrap();
        assert_ne!(default, body);
        assert!(ctx.add_switch_case(sw, Some(a), &[]).is_err());

        let StmtKind::Switch(switch) = &ctx.stmt(sw).kind else {
            panic!("not a switch");
        };
        assert_eq!(
            switch.cases.keys().last(),
            Some(&SwitchCase::Default)
        );

        ctx.remove_switch_case_stmt(sw, Some(zero), s1).unwrap();
        assert_eq!(ctx.stmt(body).as_block().unwrap().stmts, vec![s0]);
        ctx.remove_switch_case(sw, None).unwrap();
        let StmtKind::Switch(switch) = &ctx.stmt(sw).kind else {
            panic!("not a switch");
        };
        assert_eq!(switch.cases.len(), 1);
    }

    #[test]
    fn unassign_drops_edges() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let stmt = ctx.assign(a, b, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        ctx.unassign(stmt).unwrap();
        assert!(ctx.var(a).sources.is_empty());
        assert!(ctx.var(b).sinks.is_empty());
        assert!(ctx.scope(top).stmts().is_empty());
        assert!(ctx.stmt(stmt).parent.is_none());
    }

    #[test]
    fn statement_cannot_have_two_parents() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let stmt = ctx.assign(a, b, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        let comb = ctx.comb_block(top).unwrap();
        let err = ctx.block_add_stmt(comb, stmt).unwrap_err();
        assert!(matches!(err, IrError::Stmt { .. }));
    }

    #[test]
    fn block_cannot_contain_itself() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let block = ctx.scoped_block(top);
        let err = ctx.block_add_stmt(block, block).unwrap_err();
        assert_eq!(
            err,
            IrError::Stmt {
                message: "block cannot be added to itself".to_string(),
                stmts: vec![block, block],
            }
        );
        assert!(ctx.stmt(block).parent.is_none());
        let stmt = ctx.assign(a, b, AssignmentType::Undefined).unwrap();
        ctx.block_add_stmt(block, stmt).unwrap();
        assert_eq!(ctx.stmt(block).as_block().unwrap().stmts, vec![stmt]);
    }

    #[test]
    fn nested_blocks_cannot_form_a_cycle() {
        let (mut ctx, top) = setup();
        let comb = ctx.comb_block(top).unwrap();
        let outer = ctx.scoped_block(top);
        let inner = ctx.scoped_block(top);
        ctx.block_add_stmt(outer, inner).unwrap();
        let err = ctx.block_add_stmt(inner, outer).unwrap_err();
        assert_eq!(
            err,
            IrError::Stmt {
                message: "block statement already encloses the block it is added to".to_string(),
                stmts: vec![outer, inner],
            }
        );
        let deepest = ctx.scoped_block(top);
        ctx.block_add_stmt(inner, deepest).unwrap();
        assert!(ctx.block_add_stmt(deepest, outer).is_err());

        ctx.block_add_stmt(comb, outer).unwrap();
        assert_eq!(ctx.stmt_scope(deepest), Some(top));
        let sel = ctx.declare_var(top, VarDecl::new("sel", 1)).unwrap();
        let cond = ctx.if_stmt(sel).unwrap();
        ctx.block_add_stmt(deepest, cond).unwrap();
        assert!(ctx.add_then_stmt(cond, outer).is_err());
    }

    #[test]
    fn failed_attach_leaves_statement_detached() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let x = ctx.declare_var(top, VarDecl::new("x", 8)).unwrap();
        let y = ctx.declare_var(top, VarDecl::new("y", 8)).unwrap();
        let c = ctx.constant(1, 4, false).unwrap();
        let cat = ctx.concat(a, c).unwrap();
        let comb = ctx.comb_block(top).unwrap();
        let bad = ctx.assign(cat, x, AssignmentType::Undefined).unwrap();
        assert!(ctx.block_add_stmt(comb, bad).is_err());
        assert!(ctx.stmt(bad).parent.is_none());
        assert!(ctx.var(a).sources.is_empty());
        assert!(ctx.var(x).sinks.is_empty());
        assert!(ctx.stmt(comb).as_block().unwrap().stmts.is_empty());

        let good = ctx.assign(y, x, AssignmentType::Undefined).unwrap();
        ctx.block_add_stmt(comb, good).unwrap();
        assert_eq!(ctx.stmt(comb).as_block().unwrap().stmts, vec![good]);
    }
}
