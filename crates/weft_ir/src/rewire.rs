//! Moving the drivers and readers of one value onto another.
//!
//! Assignments are rewritten in place: every occurrence of the old value in
//! the affected side is replaced by the new one, rebuilding the enclosing
//! slices and expressions through the memoized constructors. A statement the
//! edge sets claim references the old value, but that does not, means the
//! graph was already broken; that surfaces as an internal error.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{ScopeId, StmtId, VarId};
use crate::slice::SliceKey;
use crate::stmt::{AssignmentType, StmtKind};
use crate::var::VarKind;
use log::debug;
use std::collections::BTreeMap;

impl Context {
    /// Replaces every occurrence of `target` inside `var` with `repl`.
    ///
    /// Returns the rewritten node (`var` itself when nothing matched) and the
    /// number of replacements made.
    #[track_caller]
    pub fn rewrite(&mut self, var: VarId, target: VarId, repl: VarId) -> IrResult<(VarId, usize)> {
        if var == target {
            return Ok((repl, 1));
        }
        match self.vars[var].kind.clone() {
            VarKind::Slice(data) => {
                let (parent, n) = self.rewrite(data.parent, target, repl)?;
                let (key, m) = match data.key {
                    SliceKey::Index(index) => {
                        let (index, m) = self.rewrite(index, target, repl)?;
                        (SliceKey::Index(index), m)
                    }
                    key => (key, 0),
                };
                if n + m == 0 {
                    return Ok((var, 0));
                }
                Ok((self.slice_with_key(parent, key)?, n + m))
            }
            VarKind::Expr { op, left, right } => {
                let (l, n) = self.rewrite(left, target, repl)?;
                let (r, m) = match right {
                    Some(right) => {
                        let (r, m) = self.rewrite(right, target, repl)?;
                        (Some(r), m)
                    }
                    None => (None, 0),
                };
                if n + m == 0 {
                    return Ok((var, 0));
                }
                Ok((self.expr(op, l, r)?, n + m))
            }
            VarKind::Conditional { cond, left, right } => {
                let (c, a) = self.rewrite(cond, target, repl)?;
                let (l, b) = self.rewrite(left, target, repl)?;
                let (r, d) = self.rewrite(right, target, repl)?;
                if a + b + d == 0 {
                    return Ok((var, 0));
                }
                Ok((self.mux(c, l, r)?, a + b + d))
            }
            VarKind::Concat { members } => {
                let mut count = 0;
                let mut rewritten = Vec::with_capacity(members.len());
                for member in members {
                    let (m, n) = self.rewrite(member, target, repl)?;
                    rewritten.push(m);
                    count += n;
                }
                if count == 0 {
                    return Ok((var, 0));
                }
                let mut acc = rewritten[0];
                for &member in &rewritten[1..] {
                    acc = self.concat(acc, member)?;
                }
                Ok((acc, count))
            }
            VarKind::Extend { source } => {
                let (s, n) = self.rewrite(source, target, repl)?;
                if n == 0 {
                    return Ok((var, 0));
                }
                let width = self.vars[var].width();
                Ok((self.extend(s, width)?, n))
            }
            VarKind::Cast { parent, cast } => {
                let (p, n) = self.rewrite(parent, target, repl)?;
                if n == 0 {
                    return Ok((var, 0));
                }
                Ok((self.cast(p, cast)?, n))
            }
            VarKind::FunctionCall { func, args } => {
                let mut count = 0;
                let mut rewritten = BTreeMap::new();
                for (port, arg) in args {
                    let (a, n) = self.rewrite(arg, target, repl)?;
                    rewritten.insert(port, a);
                    count += n;
                }
                if count == 0 {
                    return Ok((var, 0));
                }
                let v = &self.vars[var];
                let (scope, has_return) = (v.scope, v.width() > 0);
                Ok((self.build_call(scope, func, rewritten, has_return)?, count))
            }
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::Const { .. }
            | VarKind::Param(_)
            | VarKind::EnumConst { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => Ok((var, 0)),
        }
    }

    fn check_movable(&self, old: VarId, new: VarId) -> IrResult<()> {
        match self.vars[old].kind {
            VarKind::Base
            | VarKind::Port { .. }
            | VarKind::EnumVar { .. }
            | VarKind::PackedStruct { .. } => Ok(()),
            _ => Err(IrError::var(
                "Only base or port variables are allowed.",
                vec![old, new],
            )),
        }
    }

    fn edges_in(&self, edges: impl IntoIterator<Item = StmtId>, scope: ScopeId) -> Vec<StmtId> {
        edges
            .into_iter()
            .filter(|&s| self.stmt_scope(s) == Some(scope))
            .collect()
    }

    fn assign_sides(&self, stmt: StmtId) -> IrResult<(VarId, VarId)> {
        self.stmts[stmt]
            .as_assign()
            .map(|a| (a.left, a.right))
            .ok_or_else(|| IrError::internal("dependency edge points at a non-assignment"))
    }

    fn set_assign_sides(&mut self, stmt: StmtId, left: VarId, right: VarId) {
        if let StmtKind::Assign(assign) = &mut self.stmts[stmt].kind {
            assign.left = left;
            assign.right = right;
        }
    }

    #[track_caller]
    fn mark_rewired(&mut self, stmt: StmtId, scope: ScopeId) {
        let loc = self.caller_loc(scope);
        self.stmts[stmt].locs.extend(loc);
    }

    fn inherit_width_param(&mut self, from: VarId, new: VarId) -> IrResult<()> {
        if let (Some(param), None) = (self.vars[from].width_param, self.vars[new].width_param) {
            debug!(
                "{} inherits width parameter {}",
                self.to_string(new),
                self.name(param)
            );
            self.set_width_param(new, param)?;
        }
        Ok(())
    }

    /// Moves the assignments in `scope` that drive `old` onto `new`.
    ///
    /// With `keep_connection`, `old = new` is added to `scope` so `old`
    /// still carries the value.
    #[track_caller]
    pub fn move_src_to(
        &mut self,
        old: VarId,
        new: VarId,
        scope: ScopeId,
        keep_connection: bool,
    ) -> IrResult<()> {
        self.check_movable(old, new)?;
        let stmts = self.edges_in(self.vars[old].sources.clone(), scope);
        debug!(
            "moving {} source(s) of {} to {}",
            stmts.len(),
            self.handle_name(old, false),
            self.handle_name(new, false)
        );
        for stmt in stmts {
            let (left, right) = self.assign_sides(stmt)?;
            let (left, count) = self.rewrite(left, old, new)?;
            if count == 0 {
                return Err(IrError::internal("Target not found"));
            }
            self.set_assign_sides(stmt, left, right);
            self.mark_rewired(stmt, scope);
            self.add_source(left, stmt)?;
            self.inherit_width_param(right, new)?;
        }
        self.vars[old].sources.clear();

        if keep_connection {
            let bridge = self.assign(old, new, AssignmentType::Undefined)?;
            self.add_stmt(scope, bridge)?;
        }
        Ok(())
    }

    /// Moves the assignments in `scope` that read `old` onto `new`.
    ///
    /// With `keep_connection`, `new = old` is added to `scope` so `new`
    /// still carries the value.
    #[track_caller]
    pub fn move_sink_to(
        &mut self,
        old: VarId,
        new: VarId,
        scope: ScopeId,
        keep_connection: bool,
    ) -> IrResult<()> {
        self.check_movable(old, new)?;
        let stmts = self.edges_in(self.vars[old].sinks.clone(), scope);
        debug!(
            "moving {} sink(s) of {} to {}",
            stmts.len(),
            self.handle_name(old, false),
            self.handle_name(new, false)
        );
        for stmt in stmts {
            let (left, right) = self.assign_sides(stmt)?;
            let (right, n) = self.rewrite(right, old, new)?;
            // `old` may also be read as an index on the driven side.
            let (left, m) = if self.slice_root(left) == old {
                (left, 0)
            } else {
                self.rewrite(left, old, new)?
            };
            if n + m == 0 {
                return Err(IrError::internal("Target not found"));
            }
            self.set_assign_sides(stmt, left, right);
            self.mark_rewired(stmt, scope);
            self.add_sink(right, stmt)?;
            if m > 0 {
                self.add_source(left, stmt)?;
            }
            self.inherit_width_param(left, new)?;
        }
        self.vars[old].sinks.clear();

        if keep_connection {
            let bridge = self.assign(new, old, AssignmentType::Undefined)?;
            self.add_stmt(scope, bridge)?;
        }
        Ok(())
    }

    /// Hands every cached view of `old` (slices, concatenations, extensions
    /// and casts) over to `new`, so requesting the same view through `new`
    /// returns the node that already exists.
    pub fn move_linked_to(&mut self, old: VarId, new: VarId) -> IrResult<()> {
        let (o, n) = (&self.vars[old], &self.vars[new]);
        if o.width() != n.width() {
            return Err(IrError::var(
                format!(
                    "Try to move linked variable to a variable that doesn't match width. Need {}, got {}",
                    o.width(),
                    n.width()
                ),
                vec![old, new],
            ));
        }
        if o.signed != n.signed {
            let sign = |signed: bool| if signed { "signed" } else { "unsigned" };
            return Err(IrError::var(
                format!(
                    "Try to move linked variable to a variable that doesn't match sign. Need {}, got {}",
                    sign(o.signed),
                    sign(n.signed)
                ),
                vec![old, new],
            ));
        }
        let new_scope = n.scope;
        let same_shape = o.var_width == n.var_width && o.size == n.size;

        let o = &mut self.vars[old];
        let slices = std::mem::take(&mut o.slices);
        let concats = std::mem::take(&mut o.concats);
        let extended = std::mem::take(&mut o.extended);
        let casted = std::mem::take(&mut o.casted);
        debug!(
            "moving {} linked view(s) of {}",
            slices.len() + concats.len() + extended.len() + casted.len(),
            self.to_string(old)
        );

        for (key, slice) in slices {
            let v = &mut self.vars[slice];
            if let VarKind::Slice(data) = &mut v.kind {
                data.parent = new;
            }
            self.vars[new].slices.insert(key, slice);
            self.rehome_slices(slice, new_scope);
        }
        for concat in concats {
            if let VarKind::Concat { members } = &mut self.vars[concat].kind {
                for member in members.iter_mut().filter(|m| **m == old) {
                    *member = new;
                }
            }
            let owned = &mut self.vars[new].concats;
            if !owned.contains(&concat) {
                owned.push(concat);
            }
        }
        for (width, ext) in extended {
            if let VarKind::Extend { source } = &mut self.vars[ext].kind {
                *source = new;
            }
            self.vars[new].extended.insert(width, ext);
        }
        for (cast, view) in casted {
            if let VarKind::Cast { parent, .. } = &mut self.vars[view].kind {
                *parent = new;
            }
            self.vars[new].casted.insert(cast, view);
        }
        if same_shape {
            self.refresh_views(new)?;
        }
        Ok(())
    }

    /// Moves `slice` and every slice nested under it into `scope`.
    fn rehome_slices(&mut self, slice: VarId, scope: ScopeId) {
        self.vars[slice].scope = scope;
        let nested: Vec<VarId> = self.vars[slice].slices.values().copied().collect();
        for id in nested {
            self.rehome_slices(id, scope);
        }
    }
}
