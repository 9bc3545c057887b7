//! Canonical strings and hierarchical handle names.
//!
//! All three renderings share one recursive walk over the expression tree and
//! differ only in how a leaf (a named value or a constant) is printed.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::expr::{CastKind, ExprOp};
use crate::ids::{ScopeId, VarId};
use crate::slice::SliceKey;
use crate::var::VarKind;
use std::convert::Infallible;

type Leaf<'a, E> = &'a dyn Fn(&Context, VarId) -> Result<String, E>;

impl Context {
    /// The canonical string of a value, as it would appear in generated code
    /// inside its own scope.
    pub fn to_string(&self, var: VarId) -> String {
        match self.render::<Infallible>(var, true, &|ctx, v| Ok(ctx.plain_leaf(v))) {
            Ok(s) => s,
            Err(never) => match never {},
        }
    }

    /// The fully-qualified name of a value; `ignore_top` drops the root scope.
    pub fn handle_name(&self, var: VarId, ignore_top: bool) -> String {
        let leaf = |ctx: &Context, v: VarId| Ok(ctx.qualified_leaf(v, ignore_top));
        match self.render::<Infallible>(var, true, &leaf) {
            Ok(s) => s,
            Err(never) => match never {},
        }
    }

    /// The name of a value relative to `scope`. Fails when a named value in
    /// the tree does not live under `scope`.
    pub fn handle_name_in(&self, var: VarId, scope: ScopeId) -> IrResult<String> {
        let leaf = |ctx: &Context, v: VarId| ctx.relative_leaf(v, scope);
        self.render(var, true, &leaf)
    }

    fn plain_leaf(&self, var: VarId) -> String {
        let v = &self.vars[var];
        match v.kind {
            VarKind::Const { value } if value < 0 => {
                format!("-{}'h{:X}", v.width(), value.unsigned_abs())
            }
            VarKind::Const { value } => format!("{}'h{value:X}", v.width()),
            _ => self.resolve(v.name).to_string(),
        }
    }

    fn qualified_leaf(&self, var: VarId, ignore_top: bool) -> String {
        let v = &self.vars[var];
        let plain = self.plain_leaf(var);
        if matches!(v.kind, VarKind::Const { .. } | VarKind::EnumConst { .. }) {
            return plain;
        }
        let scope = self.scope_handle_name(v.scope, ignore_top);
        if scope.is_empty() {
            plain
        } else {
            format!("{scope}.{plain}")
        }
    }

    fn relative_leaf(&self, var: VarId, scope: ScopeId) -> IrResult<String> {
        let v = &self.vars[var];
        if matches!(v.kind, VarKind::Const { .. } | VarKind::EnumConst { .. }) {
            return Ok(self.plain_leaf(var));
        }
        let full = self.qualified_leaf(var, false);
        let prefix = format!("{}.", self.scope_handle_name(scope, false));
        match full.strip_prefix(&prefix) {
            Some(rest) => Ok(rest.to_string()),
            None => Err(IrError::var(
                format!(
                    "{} is not accessible from {}",
                    self.scope_handle_name(scope, false),
                    self.scope_handle_name(v.scope, false)
                ),
                vec![var],
            )),
        }
    }

    fn render<E>(&self, var: VarId, top: bool, leaf: Leaf<'_, E>) -> Result<String, E> {
        match &self.vars[var].kind {
            VarKind::Expr { op, left, right } => {
                let l = self.render_operand(*left, *op, leaf)?;
                let s = match right {
                    Some(right) => {
                        let r = self.render_operand(*right, *op, leaf)?;
                        format!("{l} {op} {r}")
                    }
                    None => format!("{op}{l}"),
                };
                Ok(if top { s } else { format!("({s})") })
            }
            VarKind::Conditional { cond, left, right } => Ok(format!(
                "{} ? {}: {}",
                self.render(*cond, true, leaf)?,
                self.render(*left, true, leaf)?,
                self.render(*right, true, leaf)?
            )),
            VarKind::Concat { members } => {
                let parts = members
                    .iter()
                    .map(|&m| self.render(m, true, leaf))
                    .collect::<Result<Vec<_>, E>>()?;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            VarKind::Extend { source } => Ok(format!(
                "{}'({})",
                self.vars[var].width(),
                self.render(*source, true, leaf)?
            )),
            VarKind::Slice(data) => {
                let parent = self.render(data.parent, true, leaf)?;
                let parent = match self.vars[data.parent].kind {
                    VarKind::Expr { .. } | VarKind::Conditional { .. } => format!("({parent})"),
                    _ => parent,
                };
                Ok(match data.key {
                    SliceKey::Range { high, low } if high == low => format!("{parent}[{high}]"),
                    SliceKey::Range { high, low } => format!("{parent}[{high}:{low}]"),
                    SliceKey::Index(index) => {
                        format!("{parent}[{}]", self.render(index, true, leaf)?)
                    }
                    SliceKey::Member(name) => format!("{parent}.{}", self.resolve(name)),
                })
            }
            VarKind::Cast { parent, cast } => {
                let p = self.render(*parent, true, leaf)?;
                Ok(match cast {
                    CastKind::Signed => format!("signed'({p})"),
                    CastKind::Unsigned => format!("unsigned'({p})"),
                    CastKind::Clock | CastKind::AsyncReset => p,
                })
            }
            VarKind::FunctionCall { func, args } => {
                let ordering = self
                    .function_def(*func)
                    .map(|def| (def.name, def.ordering.clone()))
                    .ok();
                let mut rendered = Vec::with_capacity(args.len());
                for (port, &arg) in args {
                    let rank = ordering
                        .as_ref()
                        .and_then(|(_, o)| o.get(port).copied())
                        .unwrap_or(u32::MAX);
                    rendered.push((rank, self.resolve(*port), self.render(arg, true, leaf)?));
                }
                rendered.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
                let name = ordering.map_or("", |(name, _)| self.resolve(name));
                let args: Vec<String> = rendered.into_iter().map(|(_, _, s)| s).collect();
                Ok(format!("{name} ({})", args.join(", ")))
            }
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::Const { .. }
            | VarKind::Param(_)
            | VarKind::EnumConst { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => leaf(self, var),
        }
    }

    fn render_operand<E>(
        &self,
        var: VarId,
        parent_op: ExprOp,
        leaf: Leaf<'_, E>,
    ) -> Result<String, E> {
        match &self.vars[var].kind {
            VarKind::Expr { op, .. } => self.render(var, *op == parent_op, leaf),
            VarKind::Conditional { .. } => Ok(format!("({})", self.render(var, true, leaf)?)),
            _ => self.render(var, true, leaf),
        }
    }
}
