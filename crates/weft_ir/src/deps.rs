//! Source and sink edges between values and the assignments that touch them.
//!
//! Edges are always recorded on the underlying declared value: slices defer
//! to their parent, concatenations to their members, and read-only views to
//! whatever they read.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{StmtId, VarId};
use crate::var::VarKind;
use log::{debug, trace};

impl Context {
    pub(crate) fn add_source(&mut self, var: VarId, stmt: StmtId) -> IrResult<()> {
        match &self.vars[var].kind {
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => {
                trace!("{} <- stmt {}", self.handle_name(var, false), stmt.as_raw());
                self.vars[var].sources.insert(stmt);
                Ok(())
            }
            VarKind::Slice(data) => {
                let (parent, index) = (data.parent, data.index());
                if let Some(index) = index {
                    self.add_sink(index, stmt)?;
                }
                self.add_source(parent, stmt)
            }
            VarKind::Concat { members } => {
                for member in members.clone() {
                    self.add_source(member, stmt)?;
                }
                Ok(())
            }
            VarKind::Const { .. } | VarKind::EnumConst { .. } | VarKind::Param(_) => {
                Err(IrError::var(
                    format!(
                        "const {} is not allowed to be driven by a net",
                        self.to_string(var)
                    ),
                    vec![var],
                ))
            }
            VarKind::Extend { source } => Err(IrError::stmt(
                format!(
                    "Cannot add source to an extended variable ({})",
                    self.to_string(*source)
                ),
                vec![stmt],
            )),
            VarKind::Cast { .. } => Err(IrError::var(
                format!("{} is not allowed to be a sink", self.to_string(var)),
                vec![var],
            )),
            VarKind::Expr { .. } | VarKind::Conditional { .. } | VarKind::FunctionCall { .. } => {
                Err(IrError::var(
                    format!("Cannot add source to an expression ({})", self.to_string(var)),
                    vec![var],
                ))
            }
        }
    }

    pub(crate) fn add_sink(&mut self, var: VarId, stmt: StmtId) -> IrResult<()> {
        match &self.vars[var].kind {
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. }
            | VarKind::Param(_) => {
                trace!("{} -> stmt {}", self.handle_name(var, false), stmt.as_raw());
                self.vars[var].sinks.insert(stmt);
                Ok(())
            }
            VarKind::Const { .. } => {
                self.rehome_const(var, stmt);
                Ok(())
            }
            VarKind::EnumConst { .. } => Ok(()),
            VarKind::FunctionCall { func, args } => {
                let func = *func;
                let args: Vec<VarId> = args.values().copied().collect();
                for arg in args {
                    self.add_sink(arg, stmt)?;
                }
                self.rehome_call(var, func, stmt)
            }
            _ => {
                for operand in self.read_operands(var) {
                    self.add_sink(operand, stmt)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn remove_source(&mut self, var: VarId, stmt: StmtId) {
        match &self.vars[var].kind {
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => {
                trace!("{} <- stmt {} removed", self.handle_name(var, false), stmt.as_raw());
                self.vars[var].sources.remove(&stmt);
            }
            VarKind::Slice(data) => {
                let (parent, index) = (data.parent, data.index());
                if let Some(index) = index {
                    self.remove_sink(index, stmt);
                }
                self.remove_source(parent, stmt);
            }
            VarKind::Concat { members } => {
                for member in members.clone() {
                    self.remove_source(member, stmt);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn remove_sink(&mut self, var: VarId, stmt: StmtId) {
        match &self.vars[var].kind {
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. }
            | VarKind::Param(_) => {
                trace!("{} -> stmt {} removed", self.handle_name(var, false), stmt.as_raw());
                self.vars[var].sinks.remove(&stmt);
            }
            VarKind::Const { .. } | VarKind::EnumConst { .. } => {}
            _ => {
                for operand in self.read_operands(var) {
                    self.remove_sink(operand, stmt);
                }
            }
        }
    }

    /// Values read when `var` is read.
    fn read_operands(&self, var: VarId) -> Vec<VarId> {
        match &self.vars[var].kind {
            VarKind::Slice(data) => data.index().into_iter().chain([data.parent]).collect(),
            VarKind::Concat { members } => members.clone(),
            VarKind::Expr { left, right, .. } => [*left].into_iter().chain(*right).collect(),
            VarKind::Conditional { cond, left, right } => vec![*cond, *left, *right],
            VarKind::Extend { source } => vec![*source],
            VarKind::Cast { parent, .. } => vec![*parent],
            VarKind::FunctionCall { args, .. } => args.values().copied().collect(),
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::Const { .. }
            | VarKind::Param(_)
            | VarKind::EnumConst { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => Vec::new(),
        }
    }

    /// Moves a free-standing constant next to the module that reads it: the
    /// parent of the scope the assignment drives.
    fn rehome_const(&mut self, var: VarId, stmt: StmtId) {
        let v = &self.vars[var];
        if v.scope != self.const_scope() {
            return;
        }
        let Some(assign) = self.stmts[stmt].as_assign() else {
            return;
        };
        let left_scope = self.vars[assign.left].scope;
        if let Some(parent) = self.scopes[left_scope].parent {
            let key = (v.value().unwrap_or_default(), v.var_width, v.signed);
            if self.const_pool.get(&key) == Some(&var) {
                self.const_pool.remove(&key);
            }
            debug!(
                "moving constant {} into {}",
                self.to_string(var),
                self.scope_handle_name(parent, false)
            );
            self.vars[var].scope = parent;
        }
    }

    /// A call built in the constant scope belongs to the scope of the first
    /// assignment that reads it.
    fn rehome_call(&mut self, var: VarId, func: StmtId, stmt: StmtId) -> IrResult<()> {
        if self.vars[var].scope != self.const_scope() {
            return Ok(());
        }
        let Some(assign) = self.stmts[stmt].as_assign() else {
            return Ok(());
        };
        let scope = self.vars[assign.left].scope;
        debug!(
            "moving call {} into {}",
            self.to_string(var),
            self.scope_handle_name(scope, false)
        );
        self.vars[var].scope = scope;
        let name = self.function_def(func)?.name;
        if !self.scopes[scope].functions().contains_key(&name) {
            self.add_function(scope, func)?;
            self.add_call_var(scope, var);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::error::IrError;
    use crate::expr::CastKind;
    use crate::stmt::AssignmentType;
    use crate::var::VarDecl;

    #[test]
    fn slices_record_on_root() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 8)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let hi = ctx.slice(a, 7, 4).unwrap();
        let stmt = ctx.assign(hi, b, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        assert!(ctx.var(a).sources.contains(&stmt));
        assert!(ctx.var(hi).sources.is_empty());
        assert!(ctx.var(b).sinks.contains(&stmt));
    }

    #[test]
    fn index_is_a_sink_on_both_sides() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 4).array(&[4]))
            .unwrap();
        let i = ctx.declare_var(top, VarDecl::new("i", 2)).unwrap();
        let d = ctx.declare_var(top, VarDecl::new("d", 4)).unwrap();
        let elem = ctx.slice_by(mem, i).unwrap();
        let write = ctx.assign(elem, d, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, write).unwrap();
        assert!(ctx.var(mem).sources.contains(&write));
        assert!(ctx.var(i).sinks.contains(&write));
        let read = ctx.assign(d, elem, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, read).unwrap();
        assert!(ctx.var(mem).sinks.contains(&read));
        assert!(ctx.var(i).sinks.contains(&read));
    }

    #[test]
    fn expressions_cannot_be_driven() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let sum = ctx.add(a, b).unwrap();
        let err = ctx.add_source(sum, crate::ids::StmtId::from_raw(0)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot add source to an expression (a + b)");
        let signed = ctx.cast(a, CastKind::Signed).unwrap();
        let err = ctx.add_source(signed, crate::ids::StmtId::from_raw(0)).unwrap_err();
        assert!(matches!(err, IrError::Var { .. }));
    }

    #[test]
    fn free_constant_moves_next_to_reader() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let child = ctx.add_child_scope(top, "sub", "u_sub").unwrap();
        let p = ctx
            .declare_port(child, crate::var::PortDirection::In, VarDecl::new("p", 4))
            .unwrap();
        let c = ctx.constant(5, 4, false).unwrap();
        let stmt = ctx.assign(p, c, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        assert_eq!(ctx.var(c).scope, top);
        assert_ne!(ctx.constant(5, 4, false).unwrap(), c);
    }

    #[test]
    fn remove_edges() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let c = ctx.declare_var(top, VarDecl::new("c", 4)).unwrap();
        let sum = ctx.add(b, c).unwrap();
        let stmt = ctx.assign(a, sum, AssignmentType::Undefined).unwrap();
        ctx.add_stmt(top, stmt).unwrap();
        assert!(ctx.var(c).sinks.contains(&stmt));
        ctx.remove_source(a, stmt);
        ctx.remove_sink(sum, stmt);
        assert!(ctx.var(a).sources.is_empty());
        assert!(ctx.var(b).sinks.is_empty());
        assert!(ctx.var(c).sinks.is_empty());
    }
}
