//! Slice views: static ranges, variable indices and packed struct members.
//!
//! A slice of a scalar selects bits; a slice of an array selects elements of
//! the outermost dimension. Every slice records its absolute bit bounds inside
//! the root value, accumulated through any chain of nested slices.

use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::ids::VarId;
use crate::var::{total_width, Var, VarKind};
use log::debug;
use serde::{Deserialize, Serialize};
use weft_common::Ident;

/// The canonical key a slice is memoized under on its parent.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum SliceKey {
    /// `[high:low]`, or `[i]` when both are equal.
    Range {
        /// Upper bound, inclusive.
        high: u32,
        /// Lower bound, inclusive.
        low: u32,
    },
    /// `[index]` with a runtime index value.
    Index(VarId),
    /// `.member` of a packed struct.
    Member(Ident),
}

/// Slice state stored in [`VarKind::Slice`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SliceData {
    /// The sliced value.
    pub parent: VarId,
    /// How the slice was requested.
    pub key: SliceKey,
    /// Upper bound in parent units (bits or elements).
    pub high: u32,
    /// Lower bound in parent units.
    pub low: u32,
    /// Absolute upper bit inside the root value.
    pub var_high: u32,
    /// Absolute lower bit inside the root value.
    pub var_low: u32,
}

impl SliceData {
    /// The index value of a variable-indexed slice.
    pub fn index(&self) -> Option<VarId> {
        match self.key {
            SliceKey::Index(index) => Some(index),
            _ => None,
        }
    }
}

fn clog2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}

impl Context {
    /// `var[high:low]`.
    #[track_caller]
    pub fn slice(&mut self, var: VarId, high: u32, low: u32) -> IrResult<VarId> {
        self.slice_with_key(var, SliceKey::Range { high, low })
    }

    /// `var[i]`.
    #[track_caller]
    pub fn bit(&mut self, var: VarId, i: u32) -> IrResult<VarId> {
        self.slice(var, i, i)
    }

    /// `var[index]` with a runtime index.
    #[track_caller]
    pub fn slice_by(&mut self, var: VarId, index: VarId) -> IrResult<VarId> {
        self.slice_with_key(var, SliceKey::Index(index))
    }

    /// `var.name` of a packed struct value.
    #[track_caller]
    pub fn member(&mut self, var: VarId, name: &str) -> IrResult<VarId> {
        let VarKind::PackedStruct { def } = self.vars[var].kind else {
            return Err(IrError::var(
                format!("{} is not a packed struct", self.to_string(var)),
                vec![var],
            ));
        };
        let found = self
            .lookup(name)
            .filter(|&ident| self.structs[def].members.iter().any(|m| m.name == ident));
        match found {
            Some(ident) => self.slice_with_key(var, SliceKey::Member(ident)),
            None => Err(IrError::var(
                format!(
                    "{name} does not exist in {}",
                    self.resolve(self.structs[def].name)
                ),
                vec![var],
            )),
        }
    }

    /// The root-most value under a chain of slices.
    pub fn slice_root(&self, var: VarId) -> VarId {
        let mut current = var;
        while let VarKind::Slice(data) = &self.vars[current].kind {
            current = data.parent;
        }
        current
    }

    #[track_caller]
    pub(crate) fn slice_with_key(&mut self, var: VarId, key: SliceKey) -> IrResult<VarId> {
        if let Some(&id) = self.vars[var].slices.get(&key) {
            debug!("reusing slice {}", self.to_string(id));
            return Ok(id);
        }
        let mut slice = match key {
            SliceKey::Range { high, low } => self.static_slice(var, high, low)?,
            SliceKey::Index(index) => self.index_slice(var, index)?,
            SliceKey::Member(name) => self.member_slice(var, name)?,
        };
        slice.locs.extend(self.caller_loc(slice.scope));
        let id = self.vars.alloc(slice);
        self.vars[var].slices.insert(key, id);
        Ok(id)
    }

    fn parent_offset(&self, var: VarId) -> u32 {
        match &self.vars[var].kind {
            VarKind::Slice(data) => data.var_low,
            _ => 0,
        }
    }

    fn static_slice(&self, var: VarId, high: u32, low: u32) -> IrResult<Var> {
        let p = &self.vars[var];
        if low > high {
            return Err(IrError::var(
                format!("low ({low}) cannot be larger than ({high})"),
                vec![var],
            ));
        }
        let offset = self.parent_offset(var);
        let (var_width, size, var_low, var_high, packed) = if p.is_scalar() {
            if p.explicit_array {
                if high != 0 {
                    return Err(IrError::var(
                        format!(
                            "Parent {} is a scalar but used marked as an explicit array, only [0, 0] allowed",
                            self.to_string(var)
                        ),
                        vec![var],
                    ));
                }
                (p.var_width, vec![1], offset, offset + p.var_width - 1, false)
            } else {
                if high >= p.width() {
                    return Err(IrError::var(
                        format!("high ({high}) has to be smaller than width ({})", p.width()),
                        vec![var],
                    ));
                }
                (high - low + 1, vec![1], offset + low, offset + high, false)
            }
        } else {
            if high > p.size[0] {
                return Err(IrError::var(
                    format!("high ({high}) has to be smaller than size ({})", p.size[0]),
                    vec![var],
                ));
            }
            let base = element_width(p)?;
            let mut size = p.size.clone();
            size[0] = high - low + 1;
            (
                p.var_width,
                size,
                offset + low * base,
                offset + (high + 1) * base - 1,
                p.packed,
            )
        };
        let mut slice = Var::new(
            self.empty_name(),
            p.scope,
            var_width,
            size,
            p.signed,
            VarKind::Slice(SliceData {
                parent: var,
                key: SliceKey::Range { high, low },
                high,
                low,
                var_high,
                var_low,
            }),
        );
        slice.packed = packed;
        if !is_bit_select(p) {
            slice.width_param = p.width_param;
        }
        Ok(slice)
    }

    fn index_slice(&self, var: VarId, index: VarId) -> IrResult<Var> {
        let p = &self.vars[var];
        let (var_width, size) = if p.is_scalar() && !p.explicit_array {
            (1, vec![1])
        } else {
            let required = clog2(p.size[0]).max(1);
            let actual = self.vars[index].width();
            if actual != required {
                return Err(IrError::var(
                    format!(
                        "Bit extraction of array[{}:0] requires {required} bit index, not {actual} bits.",
                        p.size[0] - 1
                    ),
                    vec![var, index],
                ));
            }
            let size = if p.size.len() > 1 {
                p.size[1..].to_vec()
            } else {
                vec![1]
            };
            (p.var_width, size)
        };
        let width = total_width(var_width, &size).ok_or_else(|| too_wide(var))?;
        let offset = self.parent_offset(var);
        let mut slice = Var::new(
            self.empty_name(),
            p.scope,
            var_width,
            size,
            p.signed,
            VarKind::Slice(SliceData {
                parent: var,
                key: SliceKey::Index(index),
                high: 0,
                low: 0,
                var_high: offset + width - 1,
                var_low: offset,
            }),
        );
        slice.packed = p.packed && p.size.len() > 1;
        if !is_bit_select(p) {
            slice.width_param = p.width_param;
        }
        Ok(slice)
    }

    fn member_slice(&self, var: VarId, name: Ident) -> IrResult<Var> {
        let p = &self.vars[var];
        let VarKind::PackedStruct { def } = p.kind else {
            return Err(IrError::internal("member slice of a non-struct value"));
        };
        let mut low = 0;
        for member in &self.structs[def].members {
            if member.name == name {
                let high = low + member.width - 1;
                let offset = self.parent_offset(var);
                return Ok(Var::new(
                    self.empty_name(),
                    p.scope,
                    member.width,
                    vec![1],
                    member.signed,
                    VarKind::Slice(SliceData {
                        parent: var,
                        key: SliceKey::Member(name),
                        high,
                        low,
                        var_high: offset + high,
                        var_low: offset + low,
                    }),
                ));
            }
            low += member.width;
        }
        Err(IrError::internal("struct member disappeared"))
    }

    /// Re-derives the element width and bit bounds of every memoized slice
    /// and cast under `var` after its element width or bit position changed.
    pub(crate) fn refresh_views(&mut self, var: VarId) -> IrResult<()> {
        let offset = self.parent_offset(var);
        let p = &self.vars[var];
        let (var_width, size, width_param) = (p.var_width, p.size.clone(), p.width_param);
        let bit_select = is_bit_select(p);
        let base = element_width(p)?;
        let slices: Vec<VarId> = p.slices.values().copied().collect();
        let casts: Vec<VarId> = p.casted.values().copied().collect();
        for id in casts {
            let cast = &mut self.vars[id];
            cast.var_width = var_width;
            cast.size = size.clone();
        }
        for id in slices {
            let slice = &mut self.vars[id];
            let VarKind::Slice(data) = &slice.kind else {
                return Err(IrError::internal("memoized slice is not a slice"));
            };
            let key = data.key;
            if !bit_select && !matches!(key, SliceKey::Member(_)) {
                slice.var_width = var_width;
                slice.width_param = width_param;
            }
            let width = total_width(slice.var_width, &slice.size).ok_or_else(|| too_wide(id))?;
            let VarKind::Slice(data) = &mut slice.kind else {
                return Err(IrError::internal("memoized slice is not a slice"));
            };
            (data.var_low, data.var_high) = match key {
                SliceKey::Range { high, low } if bit_select => (offset + low, offset + high),
                SliceKey::Range { high, low } => {
                    (offset + low * base, offset + (high + 1) * base - 1)
                }
                SliceKey::Index(_) => (offset, offset + width - 1),
                SliceKey::Member(_) => (offset + data.low, offset + data.high),
            };
            self.refresh_views(id)?;
        }
        Ok(())
    }
}

/// A plain scalar's slices select bits rather than elements.
fn is_bit_select(var: &Var) -> bool {
    var.is_scalar() && !var.explicit_array
}

/// Width of one outermost element of `var`.
fn element_width(var: &Var) -> IrResult<u32> {
    let inner = var.size.get(1..).unwrap_or_default();
    total_width(var.var_width, inner)
        .ok_or_else(|| IrError::user("slice element is wider than a u32 can hold"))
}

fn too_wide(var: VarId) -> IrError {
    IrError::var("slice is wider than a u32 can hold", vec![var])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ScopeId;
    use crate::var::VarDecl;

    fn setup() -> (Context, ScopeId) {
        let mut ctx = Context::new();
        let top = ctx.add_scope("top").unwrap();
        (ctx, top)
    }

    fn bounds(ctx: &Context, var: VarId) -> (u32, u32) {
        match &ctx.var(var).kind {
            VarKind::Slice(data) => (data.var_high, data.var_low),
            other => panic!("not a slice: {other:?}"),
        }
    }

    #[test]
    fn clog2_values() {
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(5), 3);
        assert_eq!(clog2(8), 3);
        assert_eq!(clog2(9), 4);
    }

    #[test]
    fn same_slice_is_same_node() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 8)).unwrap();
        let s1 = ctx.slice(a, 7, 4).unwrap();
        let s2 = ctx.slice(a, 7, 4).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(ctx.width(s1), 4);
        assert_eq!(ctx.bit(a, 3).unwrap(), ctx.slice(a, 3, 3).unwrap());
    }

    #[test]
    fn scalar_bounds_checked() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 8)).unwrap();
        let err = ctx.slice(a, 8, 0).unwrap_err();
        assert_eq!(err.to_string(), "high (8) has to be smaller than width (8)");
        let err = ctx.slice(a, 2, 3).unwrap_err();
        assert_eq!(err.to_string(), "low (3) cannot be larger than (2)");
    }

    #[test]
    fn nested_scalar_offsets_accumulate() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 16)).unwrap();
        let upper = ctx.slice(a, 15, 8).unwrap();
        let inner = ctx.slice(upper, 5, 2).unwrap();
        assert_eq!(bounds(&ctx, upper), (15, 8));
        assert_eq!(bounds(&ctx, inner), (13, 10));
        assert_eq!(ctx.slice_root(inner), a);
    }

    #[test]
    fn array_slices_select_elements() {
        let (mut ctx, top) = setup();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 8).array(&[4, 2]))
            .unwrap();
        let s = ctx.slice(mem, 2, 1).unwrap();
        assert_eq!(ctx.var(s).size(), &[2, 2]);
        assert_eq!(ctx.var(s).var_width, 8);
        assert_eq!(ctx.width(s), 32);
        assert_eq!(bounds(&ctx, s), (47, 16));
        assert!(ctx.slice(mem, 5, 0).is_err());
    }

    #[test]
    fn explicit_array_only_allows_zero() {
        let (mut ctx, top) = setup();
        let a = ctx
            .declare_var(top, VarDecl::new("a", 8).explicit_array())
            .unwrap();
        let s = ctx.slice(a, 0, 0).unwrap();
        assert_eq!(ctx.width(s), 8);
        assert!(ctx.slice(a, 1, 0).is_err());
    }

    #[test]
    fn variable_index_width() {
        let (mut ctx, top) = setup();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 4).array(&[8]))
            .unwrap();
        let i2 = ctx.declare_var(top, VarDecl::new("i2", 2)).unwrap();
        let i3 = ctx.declare_var(top, VarDecl::new("i3", 3)).unwrap();
        let i4 = ctx.declare_var(top, VarDecl::new("i4", 4)).unwrap();

        let err = ctx.slice_by(mem, i2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bit extraction of array[7:0] requires 3 bit index, not 2 bits."
        );
        assert!(matches!(err, IrError::Var { nodes, .. } if nodes == vec![mem, i2]));
        assert!(ctx.slice_by(mem, i4).is_err());

        let s = ctx.slice_by(mem, i3).unwrap();
        assert_eq!(ctx.width(s), 4);
        assert!(ctx.var(s).is_scalar());
        assert_eq!(ctx.slice_by(mem, i3).unwrap(), s);
    }

    #[test]
    fn variable_index_on_scalar_selects_a_bit() {
        let (mut ctx, top) = setup();
        let a = ctx.declare_var(top, VarDecl::new("a", 16)).unwrap();
        let i = ctx.declare_var(top, VarDecl::new("i", 2)).unwrap();
        let s = ctx.slice_by(a, i).unwrap();
        assert_eq!(ctx.width(s), 1);
    }

    #[test]
    fn variable_index_peels_one_dimension() {
        let (mut ctx, top) = setup();
        let mem = ctx
            .declare_var(top, VarDecl::new("mem", 8).array(&[4, 3]))
            .unwrap();
        let i = ctx.declare_var(top, VarDecl::new("i", 2)).unwrap();
        let row = ctx.slice_by(mem, i).unwrap();
        assert_eq!(ctx.var(row).size(), &[3]);
        assert_eq!(ctx.width(row), 24);
    }

    #[test]
    fn struct_members() {
        let (mut ctx, top) = setup();
        let def = ctx
            .add_packed_struct("pkt", &[("valid", 1, false), ("data", 8, true)])
            .unwrap();
        let p = ctx.declare_packed_struct(top, "p", def).unwrap();
        let data = ctx.member(p, "data").unwrap();
        assert_eq!(ctx.width(data), 8);
        assert!(ctx.var(data).signed);
        assert_eq!(bounds(&ctx, data), (8, 1));
        assert_eq!(ctx.member(p, "data").unwrap(), data);

        let err = ctx.member(p, "ready").unwrap_err();
        assert_eq!(err.to_string(), "ready does not exist in pkt");
        let a = ctx.declare_var(top, VarDecl::new("a", 9)).unwrap();
        assert!(ctx.member(a, "data").is_err());
    }
}
