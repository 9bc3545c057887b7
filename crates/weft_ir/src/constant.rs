//! Constants, parameters and enums.
//!
//! Free-standing constants live in the context's constant scope and are
//! pooled by `(value, width, signed)`. Parameters are named constants that
//! drive the width of other values and can be chained so that a parent
//! parameter's updates flow into its children.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::{EnumId, ScopeId, VarId};
use crate::var::{Var, VarDecl, VarKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use weft_common::Ident;

pub(crate) type ConstKey = (i64, u32, bool);

/// Parameter state.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ParamData {
    /// Current value.
    pub value: i64,
    /// Values whose `var_width` follows this parameter.
    pub param_vars: BTreeSet<VarId>,
    /// Parameters that mirror this one.
    pub param_params: BTreeSet<VarId>,
    /// The parameter this one mirrors.
    pub parent_param: Option<VarId>,
}

/// An enum type and its members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnumDef {
    /// Type name.
    pub name: Ident,
    /// Width of every member.
    pub width: u32,
    /// The scope that declared the enum.
    pub scope: ScopeId,
    /// Members keyed by name.
    pub values: BTreeMap<Ident, VarId>,
}

/// Checks that `value` is representable in `width` bits.
pub fn check_const_range(value: i64, width: u32, signed: bool) -> IrResult<()> {
    if width == 0 {
        return Err(IrError::user("Constant width cannot be zero"));
    }
    let w = width.min(64);
    let value = i128::from(value);
    let (min, max) = if signed {
        (-(1i128 << (w - 1)), (1i128 << (w - 1)) - 1)
    } else {
        (0, (1i128 << w) - 1)
    };
    if value < min {
        return Err(IrError::user(format!(
            "{value} is smaller than the minimum value ({min}) given width {width}"
        )));
    }
    if value > max {
        return Err(IrError::user(format!(
            "{value} is larger than the maximum value ({max}) given width {width}"
        )));
    }
    Ok(())
}

impl Context {
    /// A free-standing constant. Repeated requests return the pooled node.
    #[track_caller]
    pub fn constant(&mut self, value: i64, width: u32, signed: bool) -> IrResult<VarId> {
        check_const_range(value, width, signed)?;
        let key = (value, width, signed);
        if let Some(&id) = self.const_pool.get(&key) {
            return Ok(id);
        }
        let scope = self.const_scope();
        let id = self.alloc_const(scope, value, width, signed);
        self.const_pool.insert(key, id);
        Ok(id)
    }

    /// A constant owned by `scope`.
    #[track_caller]
    pub fn constant_in(
        &mut self,
        scope: ScopeId,
        value: i64,
        width: u32,
        signed: bool,
    ) -> IrResult<VarId> {
        check_const_range(value, width, signed)?;
        Ok(self.alloc_const(scope, value, width, signed))
    }

    #[track_caller]
    fn alloc_const(&mut self, scope: ScopeId, value: i64, width: u32, signed: bool) -> VarId {
        let loc = self.caller_loc(scope);
        let mut var = Var::new(
            self.empty_name(),
            scope,
            width,
            vec![1],
            signed,
            VarKind::Const { value },
        );
        var.locs.extend(loc);
        self.vars.alloc(var)
    }

    /// Changes the value of a scope-owned constant.
    pub fn set_const_value(&mut self, var: VarId, value: i64) -> IrResult<()> {
        let v = &self.vars[var];
        if !matches!(v.kind, VarKind::Const { .. }) {
            return Err(IrError::var(
                format!("{} is not a constant", self.to_string(var)),
                vec![var],
            ));
        }
        if v.scope == self.const_scope() {
            return Err(IrError::var(
                format!("Pooled constant {} cannot be changed", self.to_string(var)),
                vec![var],
            ));
        }
        check_const_range(value, v.var_width, v.signed)?;
        self.vars[var].kind = VarKind::Const { value };
        Ok(())
    }

    /// Declares a parameter with value 0.
    #[track_caller]
    pub fn parameter(
        &mut self,
        scope: ScopeId,
        name: &str,
        width: u32,
        signed: bool,
    ) -> IrResult<VarId> {
        let loc = self.caller_loc(scope);
        let decl = VarDecl::new(name, width);
        let decl = if signed { decl.signed() } else { decl };
        self.declare(scope, decl, VarKind::Param(ParamData::default()), loc)
    }

    fn param_data(&self, param: VarId) -> IrResult<&ParamData> {
        match &self.vars[param].kind {
            VarKind::Param(data) => Ok(data),
            _ => Err(IrError::var(
                format!("{} is not a parameter", self.to_string(param)),
                vec![param],
            )),
        }
    }

    fn param_data_mut(&mut self, param: VarId) -> IrResult<&mut ParamData> {
        self.param_data(param)?;
        match &mut self.vars[param].kind {
            VarKind::Param(data) => Ok(data),
            _ => Err(IrError::internal("parameter kind changed during lookup")),
        }
    }

    /// Sets a parameter's value, resizing every value it drives and
    /// propagating down the parameter chain.
    pub fn set_param_value(&mut self, param: VarId, value: i64) -> IrResult<()> {
        let data = self.param_data(param)?;
        if value <= 0 && !data.param_vars.is_empty() {
            return Err(IrError::var(
                format!(
                    "{} is used for parametrizing variable width, thus cannot be non-positive ({value})",
                    self.name(param)
                ),
                vec![param],
            ));
        }
        let driven: Vec<VarId> = data.param_vars.iter().copied().collect();
        let chain: Vec<VarId> = data.param_params.iter().copied().collect();
        let v = &self.vars[param];
        check_const_range(value, v.var_width, v.signed)?;
        let width = if driven.is_empty() {
            0
        } else {
            self.width_from_param(param, value)?
        };
        for &var in &driven {
            self.check_width_fits(var, width)?;
        }
        self.param_data_mut(param)?.value = value;
        for var in driven {
            self.vars[var].var_width = width;
            self.refresh_views(var)?;
        }
        for child in chain {
            debug!("propagating {value} to parameter {}", self.name(child));
            self.set_param_value(child, value)?;
        }
        Ok(())
    }

    /// Makes `child` mirror every later value set on `parent`.
    pub fn set_param_chain(&mut self, child: VarId, parent: VarId) -> IrResult<()> {
        self.param_data(child)?;
        self.param_data(parent)?;
        if child == parent || self.param_reaches(child, parent) {
            return Err(IrError::var(
                format!(
                    "Chaining {} to {} would create a cycle",
                    self.name(child),
                    self.name(parent)
                ),
                vec![child, parent],
            ));
        }
        self.param_data_mut(child)?.parent_param = Some(parent);
        self.param_data_mut(parent)?.param_params.insert(child);
        Ok(())
    }

    fn param_reaches(&self, from: VarId, to: VarId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(p) = stack.pop() {
            if p == to {
                return true;
            }
            if !seen.insert(p) {
                continue;
            }
            if let VarKind::Param(data) = &self.vars[p].kind {
                stack.extend(data.param_params.iter().copied());
            }
        }
        false
    }

    /// Drives the `var_width` of `var` from `param`.
    pub fn set_width_param(&mut self, var: VarId, param: VarId) -> IrResult<()> {
        let value = self.param_data(param)?.value;
        if value <= 0 {
            return Err(IrError::var(
                format!(
                    "{} is non-positive ({value}), thus cannot be used for parametrization width",
                    self.name(param)
                ),
                vec![param],
            ));
        }
        let width = self.width_from_param(param, value)?;
        self.check_width_fits(var, width)?;
        let v = &mut self.vars[var];
        v.var_width = width;
        v.width_param = Some(param);
        self.param_data_mut(param)?.param_vars.insert(var);
        self.refresh_views(var)
    }

    fn check_width_fits(&self, var: VarId, var_width: u32) -> IrResult<()> {
        match self.vars[var].width_for(var_width) {
            Some(_) => Ok(()),
            None => Err(IrError::var(
                format!(
                    "{} would be wider than {} bits with {var_width} bits per element",
                    self.to_string(var),
                    u32::MAX
                ),
                vec![var],
            )),
        }
    }

    fn width_from_param(&self, param: VarId, value: i64) -> IrResult<u32> {
        u32::try_from(value).map_err(|_| {
            IrError::var(
                format!("{value} of {} cannot be used as a width", self.name(param)),
                vec![param],
            )
        })
    }

    /// Declares an enum type with the given members.
    pub fn add_enum(
        &mut self,
        scope: ScopeId,
        name: &str,
        width: u32,
        members: &[(&str, i64)],
    ) -> IrResult<EnumId> {
        self.check_identifier("Enum", name)?;
        let enum_name = self.intern(name);
        let taken = (0..self.enums.len() as u32)
            .any(|raw| self.enums[EnumId::from_raw(raw)].name == enum_name);
        if taken {
            return Err(IrError::user(format!("enum {name} already exists")));
        }
        let def = self.enums.alloc(EnumDef {
            name: enum_name,
            width,
            scope,
            values: BTreeMap::new(),
        });
        for &(member, value) in members {
            check_const_range(value, width, false)?;
            let ident = self.intern(member);
            if self.enums[def].values.contains_key(&ident) {
                return Err(IrError::user(format!("{member} already exists in {name}")));
            }
            let var = self.vars.alloc(Var::new(
                ident,
                scope,
                width,
                vec![1],
                false,
                VarKind::EnumConst { value, def },
            ));
            self.enums[def].values.insert(ident, var);
        }
        Ok(def)
    }

    /// Looks up an enum member by name.
    pub fn get_enum(&self, def: EnumId, name: &str) -> IrResult<VarId> {
        let enum_def = &self.enums[def];
        self.lookup(name)
            .and_then(|ident| enum_def.values.get(&ident).copied())
            .ok_or_else(|| {
                IrError::user(format!(
                    "Cannot find {name} in {}",
                    self.resolve(enum_def.name)
                ))
            })
    }

    /// Declares a variable typed by an enum.
    #[track_caller]
    pub fn declare_enum_var(&mut self, scope: ScopeId, name: &str, def: EnumId) -> IrResult<VarId> {
        let loc = self.caller_loc(scope);
        let decl = VarDecl::new(name, self.enums[def].width);
        self.declare(scope, decl, VarKind::EnumVar { def }, loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CastKind;

    #[test]
    fn unsigned_range() {
        assert!(check_const_range(15, 4, false).is_ok());
        let err = check_const_range(16, 4, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "16 is larger than the maximum value (15) given width 4"
        );
        assert!(check_const_range(-1, 4, false).is_err());
    }

    #[test]
    fn signed_range() {
        assert!(check_const_range(7, 4, true).is_ok());
        assert!(check_const_range(-8, 4, true).is_ok());
        assert!(check_const_range(8, 4, true).is_err());
        let err = check_const_range(-9, 4, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "-9 is smaller than the minimum value (-8) given width 4"
        );
    }

    #[test]
    fn wide_constants() {
        assert!(check_const_range(i64::MAX, 64, false).is_ok());
        assert!(check_const_range(i64::MIN, 64, true).is_ok());
        assert!(check_const_range(0, 0, false).is_err());
    }

    #[test]
    fn free_standing_constants_are_pooled() {
        let mut ctx = Context::new();
        let a = ctx.constant(3, 4, false).unwrap();
        let b = ctx.constant(3, 4, false).unwrap();
        let c = ctx.constant(3, 4, true).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ctx.var(a).scope, ctx.const_scope());
    }

    #[test]
    fn scoped_constant_value_can_change() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let c = ctx.constant_in(top, 1, 4, false).unwrap();
        ctx.set_const_value(c, 9).unwrap();
        assert_eq!(ctx.var(c).value(), Some(9));
        assert!(ctx.set_const_value(c, 16).is_err());
        let pooled = ctx.constant(1, 4, false).unwrap();
        assert!(ctx.set_const_value(pooled, 2).is_err());
    }

    #[test]
    fn param_drives_width() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let p = ctx.parameter(top, "WIDTH", 32, false).unwrap();
        let a = ctx
            .declare_var(top, VarDecl::new("a", 1).array(&[4]))
            .unwrap();
        assert!(ctx.set_width_param(a, p).is_err());
        ctx.set_param_value(p, 8).unwrap();
        ctx.set_width_param(a, p).unwrap();
        assert_eq!(ctx.width(a), 32);
        ctx.set_param_value(p, 3).unwrap();
        assert_eq!(ctx.var(a).var_width, 3);
        assert_eq!(ctx.width(a), 12);
        let err = ctx.set_param_value(p, 0).unwrap_err();
        assert!(err.to_string().contains("cannot be non-positive (0)"));
        assert_eq!(ctx.width(a), 12);
    }

    #[test]
    fn param_resizes_memoized_views() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let w = ctx.parameter(top, "W", 16, false).unwrap();
        ctx.set_param_value(w, 4).unwrap();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 4).array(&[2]))
            .unwrap();
        ctx.set_width_param(mem, w).unwrap();
        let first = ctx.slice(mem, 0, 0).unwrap();
        let second = ctx.slice(mem, 1, 1).unwrap();
        let low_bit = ctx.bit(second, 0).unwrap();
        let signed = ctx.cast(mem, CastKind::Signed).unwrap();
        assert_eq!(ctx.width(first), 4);

        ctx.set_param_value(w, 8).unwrap();
        assert_eq!(ctx.width(mem), 16);
        assert_eq!(ctx.slice(mem, 0, 0).unwrap(), first);
        assert_eq!(ctx.width(first), 8);
        assert_eq!(ctx.var(first).width_param, Some(w));
        assert_eq!(ctx.width(second), 8);
        let VarKind::Slice(data) = &ctx.var(second).kind else {
            panic!("not a slice");
        };
        assert_eq!((data.var_high, data.var_low), (15, 8));
        assert_eq!(ctx.width(low_bit), 1);
        let VarKind::Slice(data) = &ctx.var(low_bit).kind else {
            panic!("not a slice");
        };
        assert_eq!((data.var_high, data.var_low), (8, 8));
        assert_eq!(ctx.width(signed), 16);
    }

    #[test]
    fn param_cannot_overflow_driven_width() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let w = ctx.parameter(top, "W", 32, false).unwrap();
        ctx.set_param_value(w, 2).unwrap();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 2).array(&[1 << 16]))
            .unwrap();
        ctx.set_width_param(mem, w).unwrap();
        assert!(ctx.set_param_value(w, 1 << 16).is_err());
        assert_eq!(ctx.var(w).value(), Some(2));
        assert_eq!(ctx.width(mem), 1 << 17);
    }

    #[test]
    fn param_chain_propagates_later_updates() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let parent = ctx.parameter(top, "P", 16, false).unwrap();
        let child = ctx.parameter(top, "C", 16, false).unwrap();
        ctx.set_param_value(parent, 5).unwrap();
        ctx.set_param_chain(child, parent).unwrap();
        assert_eq!(ctx.var(child).value(), Some(0));
        ctx.set_param_value(parent, 6).unwrap();
        assert_eq!(ctx.var(child).value(), Some(6));
        assert!(ctx.set_param_chain(parent, child).is_err());
    }

    #[test]
    fn enum_members() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        let state = ctx
            .add_enum(top, "state_t", 2, &[("IDLE", 0), ("BUSY", 1)])
            .unwrap();
        let idle = ctx.get_enum(state, "IDLE").unwrap();
        assert_eq!(ctx.var(idle).value(), Some(0));
        assert_eq!(ctx.to_string(idle), "IDLE");
        let err = ctx.get_enum(state, "DONE").unwrap_err();
        assert_eq!(err, IrError::User("Cannot find DONE in state_t".to_string()));
        assert!(ctx.add_enum(top, "bad_t", 1, &[("A", 2)]).is_err());
    }

    #[test]
    fn enum_names_are_validated() {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        ctx.add_enum(top, "state_t", 1, &[("IDLE", 0)]).unwrap();
        let err = ctx.add_enum(top, "state_t", 1, &[("RUN", 0)]).unwrap_err();
        assert_eq!(err, IrError::User("enum state_t already exists".to_string()));
        let err = ctx.add_enum(top, "module", 1, &[("A", 0)]).unwrap_err();
        assert_eq!(err.to_string(), "module is a SystemVerilog keyword");
        let err = ctx.add_enum(top, "", 1, &[("A", 0)]).unwrap_err();
        assert_eq!(err, IrError::User("Enum name cannot be empty".to_string()));
    }
}
