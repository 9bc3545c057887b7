//! Operator nodes and composite views (concatenation, extension, cast).
//!
//! Every constructor validates its operands, then looks for an identical
//! node in the relevant memo cache before allocating a new one: expressions
//! are cached per owning scope, composite views on the value they derive from.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{ScopeId, VarId};
use crate::var::{Var, VarKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary and binary operators.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum ExprOp {
    /// Unary `-`.
    UMinus,
    /// Unary `~`.
    UInvert,
    /// Unary `+`.
    UPlus,
    /// `+`.
    Add,
    /// `-`.
    Minus,
    /// `*`.
    Multiply,
    /// `/`.
    Divide,
    /// `%`.
    Mod,
    /// `>>`.
    LogicalShiftRight,
    /// `>>>`.
    SignedShiftRight,
    /// `<<`.
    ShiftLeft,
    /// `|`.
    Or,
    /// `&`.
    And,
    /// `^`.
    Xor,
    /// Reduction `|`.
    UOr,
    /// Reduction `&`.
    UAnd,
    /// Reduction `^`.
    UXor,
    /// Logical `!`.
    UNot,
    /// `<`.
    LessThan,
    /// `>`.
    GreaterThan,
    /// `<=`.
    LessEqThan,
    /// `>=`.
    GreaterEqThan,
    /// `==`.
    Eq,
    /// `!=`.
    Neq,
}

impl ExprOp {
    /// The operator as written in the target language.
    pub fn symbol(self) -> &'static str {
        match self {
            ExprOp::UMinus | ExprOp::Minus => "-",
            ExprOp::UInvert => "~",
            ExprOp::UPlus | ExprOp::Add => "+",
            ExprOp::Multiply => "*",
            ExprOp::Divide => "/",
            ExprOp::Mod => "%",
            ExprOp::LogicalShiftRight => ">>",
            ExprOp::SignedShiftRight => ">>>",
            ExprOp::ShiftLeft => "<<",
            ExprOp::Or | ExprOp::UOr => "|",
            ExprOp::And | ExprOp::UAnd => "&",
            ExprOp::Xor | ExprOp::UXor => "^",
            ExprOp::UNot => "!",
            ExprOp::LessThan => "<",
            ExprOp::GreaterThan => ">",
            ExprOp::LessEqThan => "<=",
            ExprOp::GreaterEqThan => ">=",
            ExprOp::Eq => "==",
            ExprOp::Neq => "!=",
        }
    }

    /// Operators taking a single operand.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            ExprOp::UMinus
                | ExprOp::UInvert
                | ExprOp::UPlus
                | ExprOp::UOr
                | ExprOp::UAnd
                | ExprOp::UXor
                | ExprOp::UNot
        )
    }

    /// Comparison operators; their result is 1 bit wide.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            ExprOp::LessThan
                | ExprOp::GreaterThan
                | ExprOp::LessEqThan
                | ExprOp::GreaterEqThan
                | ExprOp::Eq
                | ExprOp::Neq
        )
    }

    /// Reduction operators; their result is 1 bit wide.
    pub fn is_reduction(self) -> bool {
        matches!(
            self,
            ExprOp::UOr | ExprOp::UAnd | ExprOp::UXor | ExprOp::UNot
        )
    }
}

impl fmt::Display for ExprOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Reinterpretations available through [`Context::cast`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum CastKind {
    /// `signed'(x)`.
    Signed,
    /// `unsigned'(x)`.
    Unsigned,
    /// Use a 1-bit value as a clock.
    Clock,
    /// Use a 1-bit value as an asynchronous reset.
    AsyncReset,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) enum ExprKey {
    Op(ExprOp, VarId, Option<VarId>),
    Mux(VarId, VarId, VarId),
}

macro_rules! unary_ops {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        impl Context {
            $(
                $(#[$meta])*
                #[track_caller]
                pub fn $name(&mut self, var: VarId) -> IrResult<VarId> {
                    self.expr(ExprOp::$op, var, None)
                }
            )*
        }
    };
}

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        impl Context {
            $(
                $(#[$meta])*
                #[track_caller]
                pub fn $name(&mut self, left: VarId, right: VarId) -> IrResult<VarId> {
                    self.expr(ExprOp::$op, left, Some(right))
                }
            )*
        }
    };
}

unary_ops! {
    /// `-x`.
    negate => UMinus,
    /// `~x`.
    invert => UInvert,
    /// `+x`.
    unary_plus => UPlus,
    /// Reduction or, 1 bit wide.
    r_or => UOr,
    /// Reduction and, 1 bit wide.
    r_and => UAnd,
    /// Reduction xor, 1 bit wide.
    r_xor => UXor,
    /// Logical not, 1 bit wide.
    r_not => UNot,
}

binary_ops! {
    /// `a + b`.
    add => Add,
    /// `a - b`.
    sub => Minus,
    /// `a * b`.
    mul => Multiply,
    /// `a / b`.
    div => Divide,
    /// `a % b`.
    modulo => Mod,
    /// `a << b`.
    shl => ShiftLeft,
    /// `a >> b`.
    lshr => LogicalShiftRight,
    /// `a >>> b`.
    ashr => SignedShiftRight,
    /// `a | b`.
    or => Or,
    /// `a & b`.
    and => And,
    /// `a ^ b`.
    xor => Xor,
    /// `a < b`.
    lt => LessThan,
    /// `a > b`.
    gt => GreaterThan,
    /// `a <= b`.
    le => LessEqThan,
    /// `a >= b`.
    ge => GreaterEqThan,
    /// `a == b`.
    eq => Eq,
    /// `a != b`.
    ne => Neq,
}

impl Context {
    /// Builds (or reuses) the operator node `op(left, right)`.
    #[track_caller]
    pub fn expr(&mut self, op: ExprOp, left: VarId, right: Option<VarId>) -> IrResult<VarId> {
        if op.is_unary() != right.is_none() {
            return Err(IrError::user(format!(
                "operator {op} expects {} operand(s)",
                if op.is_unary() { 1 } else { 2 }
            )));
        }
        if let Some(right) = right {
            self.check_same_width(left, right)?;
        }
        let scope = self.expr_scope(left, right);
        let key = ExprKey::Op(op, left, right);
        if let Some(&id) = self.scopes[scope].exprs.get(&key) {
            debug!("reusing expression {}", self.to_string(id));
            return Ok(id);
        }
        let l = &self.vars[left];
        let width = if op.is_relational() || op.is_reduction() {
            1
        } else {
            l.width()
        };
        let signed = match right {
            Some(r) => l.signed && self.vars[r].signed,
            None => l.signed,
        };
        let loc = self.caller_loc(scope);
        let mut var = Var::new(
            self.empty_name(),
            scope,
            width,
            vec![1],
            signed,
            VarKind::Expr { op, left, right },
        );
        var.locs.extend(loc);
        let id = self.vars.alloc(var);
        self.scopes[scope].exprs.insert(key, id);
        Ok(id)
    }

    /// `cond ? left : right`.
    #[track_caller]
    pub fn mux(&mut self, cond: VarId, left: VarId, right: VarId) -> IrResult<VarId> {
        if self.vars[cond].width() != 1 {
            return Err(IrError::var(
                "Ternary operator's condition has to be a binary value",
                vec![cond],
            ));
        }
        self.check_same_width(left, right)?;
        let scope = self.expr_scope(left, Some(right));
        let key = ExprKey::Mux(cond, left, right);
        if let Some(&id) = self.scopes[scope].exprs.get(&key) {
            debug!("reusing conditional {}", self.to_string(id));
            return Ok(id);
        }
        let signed = self.vars[left].signed && self.vars[right].signed;
        let loc = self.caller_loc(scope);
        let mut var = Var::new(
            self.empty_name(),
            scope,
            self.vars[left].width(),
            vec![1],
            signed,
            VarKind::Conditional { cond, left, right },
        );
        var.locs.extend(loc);
        let id = self.vars.alloc(var);
        self.scopes[scope].exprs.insert(key, id);
        Ok(id)
    }

    fn check_same_width(&self, left: VarId, right: VarId) -> IrResult<()> {
        let (lw, rw) = (self.vars[left].width(), self.vars[right].width());
        if lw != rw {
            return Err(IrError::var(
                format!(
                    "left ({}) width ({lw}) doesn't match with right ({}) width ({rw})",
                    self.to_string(left),
                    self.to_string(right)
                ),
                vec![left, right],
            ));
        }
        Ok(())
    }

    /// The owning scope of an expression over `left` and `right`.
    ///
    /// Constants defer to the other operand. Otherwise the scope that sees
    /// both operands wins: a parent reading its child's port, or the common
    /// parent of two sibling ports. Everything else falls back to the right
    /// operand's scope.
    pub fn expr_scope(&self, left: VarId, right: Option<VarId>) -> ScopeId {
        let l = &self.vars[left];
        let Some(right) = right else {
            return l.scope;
        };
        let r = &self.vars[right];
        let const_scope = self.const_scope();
        if l.scope == const_scope {
            return r.scope;
        }
        if r.scope == const_scope || l.scope == r.scope {
            return l.scope;
        }
        let left_parent = self.scopes[l.scope].parent;
        let right_parent = self.scopes[r.scope].parent;
        if Some(l.scope) == right_parent && r.is_port() {
            l.scope
        } else if left_parent == right_parent && l.is_port() && r.is_port() {
            right_parent.unwrap_or(r.scope)
        } else {
            r.scope
        }
    }

    /// `{first, second}`, reusing an existing node with the same members.
    ///
    /// Concatenating onto a concatenation appends to its member list; the
    /// result is cached on the first member.
    #[track_caller]
    pub fn concat(&mut self, first: VarId, second: VarId) -> IrResult<VarId> {
        let (a, b) = (&self.vars[first], &self.vars[second]);
        if a.signed != b.signed {
            let (signed, unsigned) = if a.signed {
                (first, second)
            } else {
                (second, first)
            };
            return Err(IrError::var(
                format!(
                    "{} is signed but {} is not",
                    self.to_string(signed),
                    self.to_string(unsigned)
                ),
                vec![first, second],
            ));
        }
        let members = match &a.kind {
            VarKind::Concat { members } => {
                let mut members = members.clone();
                members.push(second);
                members
            }
            _ => vec![first, second],
        };
        let owner = members[0];
        let existing = self.vars[owner].concats.iter().copied().find(|&c| {
            matches!(&self.vars[c].kind, VarKind::Concat { members: m } if *m == members)
        });
        if let Some(id) = existing {
            debug!("reusing concatenation {}", self.to_string(id));
            return Ok(id);
        }
        let width = members
            .iter()
            .try_fold(0u32, |w, &m| w.checked_add(self.vars[m].width()))
            .ok_or_else(|| {
                IrError::var(
                    "concatenation is wider than a u32 can hold",
                    vec![first, second],
                )
            })?;
        let signed = self.vars[first].signed;
        let scope = self.expr_scope(first, Some(second));
        let loc = self.caller_loc(scope);
        let mut var = Var::new(
            self.empty_name(),
            scope,
            width,
            vec![1],
            signed,
            VarKind::Concat { members },
        );
        var.locs.extend(loc);
        let id = self.vars.alloc(var);
        self.vars[owner].concats.push(id);
        Ok(id)
    }

    /// Extends `var` to `width` bits.
    #[track_caller]
    pub fn extend(&mut self, var: VarId, width: u32) -> IrResult<VarId> {
        let v = &self.vars[var];
        if width < v.width() {
            return Err(IrError::var(
                format!(
                    "Cannot extend {} (width={}) to {width}",
                    self.to_string(var),
                    v.width()
                ),
                vec![var],
            ));
        }
        if v.size.len() > 1 || v.size[0] > 1 || (v.packed && !v.is_const()) {
            return Err(IrError::var(
                format!("Cannot extend an array ({})", self.to_string(var)),
                vec![var],
            ));
        }
        if let Some(&id) = v.extended.get(&width) {
            debug!("reusing extension {}", self.to_string(id));
            return Ok(id);
        }
        let loc = self.caller_loc(v.scope);
        let mut ext = Var::new(
            self.empty_name(),
            v.scope,
            width,
            vec![1],
            v.signed,
            VarKind::Extend { source: var },
        );
        ext.locs.extend(loc);
        let id = self.vars.alloc(ext);
        self.vars[var].extended.insert(width, id);
        Ok(id)
    }

    /// Casts `var`. A sign cast of a value that already has that sign is `var` itself.
    #[track_caller]
    pub fn cast(&mut self, var: VarId, cast: CastKind) -> IrResult<VarId> {
        let v = &self.vars[var];
        match cast {
            CastKind::Signed if v.signed => return Ok(var),
            CastKind::Unsigned if !v.signed => return Ok(var),
            CastKind::Clock | CastKind::AsyncReset if v.width() != 1 || !v.is_scalar() => {
                return Err(IrError::var(
                    format!(
                        "Can only cast bit width 1 to Clock or AsyncReset. {} is {}",
                        self.to_string(var),
                        v.width()
                    ),
                    vec![var],
                ));
            }
            _ => {}
        }
        if let Some(&id) = v.casted.get(&cast) {
            return Ok(id);
        }
        let signed = match cast {
            CastKind::Signed => true,
            CastKind::Unsigned => false,
            CastKind::Clock | CastKind::AsyncReset => v.signed,
        };
        let loc = self.caller_loc(v.scope);
        let mut casted = Var::new(
            self.empty_name(),
            v.scope,
            v.var_width,
            v.size.clone(),
            signed,
            VarKind::Cast { parent: var, cast },
        );
        casted.locs.extend(loc);
        let id = self.vars.alloc(casted);
        self.vars[var].casted.insert(cast, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::{PortDirection, VarDecl};

    fn setup() -> (Context, ScopeId) {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        (ctx, top)
    }

    #[test]
    fn width_mismatch_fails() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 5)).unwrap();
        let err = ctx.add(a, b).unwrap_err();
        assert_eq!(
            err.to_string(),
            "left (a) width (4) doesn't match with right (b) width (5)"
        );
        assert!(matches!(err, IrError::Var { nodes, .. } if nodes == vec![a, b]));
    }

    #[test]
    fn relational_and_reduction_are_one_bit() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 8)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 8)).unwrap();
        for id in [
            ctx.lt(a, b).unwrap(),
            ctx.ge(a, b).unwrap(),
            ctx.eq(a, b).unwrap(),
            ctx.ne(a, b).unwrap(),
            ctx.r_or(a).unwrap(),
            ctx.r_xor(a).unwrap(),
            ctx.r_not(a).unwrap(),
        ] {
            assert_eq!(ctx.width(id), 1);
        }
        let sum = ctx.add(a, b).unwrap();
        assert_eq!(ctx.width(sum), 8);
    }

    #[test]
    fn sign_is_and_of_operands() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 8).signed()).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 8)).unwrap();
        let c = ctx.declare_var(top, VarDecl::new("c", 8).signed()).unwrap();
        let ab = ctx.mul(a, b).unwrap();
        let ac = ctx.mul(a, c).unwrap();
        let na = ctx.negate(a).unwrap();
        assert!(!ctx.var(ab).signed);
        assert!(ctx.var(ac).signed);
        assert!(ctx.var(na).signed);
    }

    #[test]
    fn expressions_are_memoized_per_scope() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 8)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 8)).unwrap();
        let x = ctx.add(a, b).unwrap();
        let y = ctx.add(a, b).unwrap();
        let z = ctx.add(b, a).unwrap();
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn scope_tie_break() {
        let (mut ctx, top) = setup();
        let child = ctx.add_child_scope(top, "child", "u0").unwrap();
        let sibling = ctx.add_child_scope(top, "child", "u1").unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let p = ctx
            .declare_port(child, PortDirection::Out, VarDecl::new("p", 4))
            .unwrap();
        let q = ctx
            .declare_port(sibling, PortDirection::In, VarDecl::new("q", 4))
            .unwrap();
        let v = ctx.declare_var(child, VarDecl::new("v", 4)).unwrap();
        let c = ctx.constant(1, 4, false).unwrap();

        assert_eq!(ctx.expr_scope(c, Some(p)), child);
        assert_eq!(ctx.expr_scope(a, Some(c)), top);
        assert_eq!(ctx.expr_scope(a, Some(p)), top);
        assert_eq!(ctx.expr_scope(p, Some(q)), top);
        assert_eq!(ctx.expr_scope(a, Some(v)), child);
        assert_eq!(ctx.expr_scope(p, None), child);
    }

    #[test]
    fn operand_count_checked() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        assert!(ctx.expr(ExprOp::Add, a, None).is_err());
        assert!(ctx.expr(ExprOp::UNot, a, Some(a)).is_err());
    }

    #[test]
    fn mux_checks() {
        let (mut ctx, top) = setup();
        let s = ctx.declare_var(top, VarDecl::new("s", 1)).unwrap();
        let wide = ctx.declare_var(top, VarDecl::new("w", 2)).unwrap();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let m = ctx.mux(s, a, b).unwrap();
        assert_eq!(ctx.width(m), 4);
        assert_eq!(ctx.mux(s, a, b).unwrap(), m);
        assert!(ctx.mux(wide, a, b).is_err());
        assert!(ctx.mux(s, a, wide).is_err());
    }

    #[test]
    fn concat_width_sign_and_reuse() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let b = ctx.declare_var(top, VarDecl::new("b", 4)).unwrap();
        let c = ctx.declare_var(top, VarDecl::new("c", 2)).unwrap();
        let s = ctx.declare_var(top, VarDecl::new("s", 4).signed()).unwrap();

        let ab = ctx.concat(a, b).unwrap();
        assert_eq!(ctx.width(ab), 8);
        assert!(!ctx.var(ab).signed);
        assert_eq!(ctx.concat(a, b).unwrap(), ab);

        let abc = ctx.concat(ab, c).unwrap();
        assert_eq!(ctx.width(abc), 10);
        assert_eq!(
            ctx.var(abc).kind,
            VarKind::Concat {
                members: vec![a, b, c]
            }
        );
        assert_eq!(ctx.concat(ab, c).unwrap(), abc);

        let err = ctx.concat(a, s).unwrap_err();
        assert_eq!(err.to_string(), "s is signed but a is not");
    }

    #[test]
    fn extend_checks() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 4)).unwrap();
        let arr = ctx
            .declare_var(top, VarDecl::new("arr", 1).array(&[4]))
            .unwrap();
        let err = ctx.extend(a, 3).unwrap_err();
        assert_eq!(err.to_string(), "Cannot extend a (width=4) to 3");
        let err = ctx.extend(arr, 16).unwrap_err();
        assert_eq!(err.to_string(), "Cannot extend an array (arr)");
        let e = ctx.extend(a, 8).unwrap();
        assert_eq!(ctx.width(e), 8);
        assert_eq!(ctx.extend(a, 8).unwrap(), e);
    }

    #[test]
    fn cast_rules() {
        let (mut ctx, top) = setup();
        let clk = ctx.declare_var(top, VarDecl::new("clk", 1)).unwrap();
        let bus = ctx.declare_var(top, VarDecl::new("bus", 2)).unwrap();
        let s = ctx.declare_var(top, VarDecl::new("s", 8).signed()).unwrap();

        let c = ctx.cast(clk, CastKind::Clock).unwrap();
        assert_eq!(ctx.cast(clk, CastKind::Clock).unwrap(), c);
        let err = ctx.cast(bus, CastKind::Clock).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can only cast bit width 1 to Clock or AsyncReset. bus is 2"
        );
        assert_eq!(ctx.cast(s, CastKind::Signed).unwrap(), s);
        assert_eq!(ctx.cast(bus, CastKind::Unsigned).unwrap(), bus);
        let u = ctx.cast(s, CastKind::Unsigned).unwrap();
        assert!(!ctx.var(u).signed);
        assert_eq!(ctx.width(u), 8);
    }
}
