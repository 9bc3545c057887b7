//! Value nodes: declared variables, ports, and every derived view over them.
//!
//! A [`Var`] is anything with a bit width, a multi-dimensional size and a
//! sign. What it *is* (a port, a slice, an expression, a constant) is the
//! closed [`VarKind`] sum type; the coarse [`VarType`] is derived from it.

use crate::constant::ParamData;
use crate::context::Context;
use crate::error::{IrError, IrResult};
use crate::expr::{CastKind, ExprOp};
use crate::ids::{EnumId, ScopeId, StmtId, StructId, VarId};
use crate::slice::{SliceData, SliceKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use weft_common::{Ident, SourceLoc};

/// Direction of a module or function port.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port.
    In,
    /// Output port.
    Out,
    /// Bidirectional port.
    InOut,
}

/// Coarse classification of a value, as seen by the emitter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum VarType {
    /// A declared variable.
    Base,
    /// A module or function port.
    PortIO,
    /// A slice of another value.
    Slice,
    /// An operator node or composite view.
    Expression,
    /// A literal constant.
    ConstValue,
    /// A named parameter.
    Parameter,
    /// A cast view.
    BaseCasted,
}

/// What a value node is.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VarKind {
    /// A declared variable.
    Base,
    /// A module or function port.
    Port {
        /// Port direction.
        direction: PortDirection,
    },
    /// A static, variable-indexed or struct-member slice.
    Slice(SliceData),
    /// A unary (`right` absent) or binary operator node.
    Expr {
        /// The operator.
        op: ExprOp,
        /// Left (or only) operand.
        left: VarId,
        /// Right operand, absent for unary operators.
        right: Option<VarId>,
    },
    /// An ordered concatenation, most significant member first.
    Concat {
        /// The concatenated values.
        members: Vec<VarId>,
    },
    /// A zero/sign extension of `source` to this node's width.
    Extend {
        /// The extended value.
        source: VarId,
    },
    /// `cond ? left : right`.
    Conditional {
        /// 1-bit selector.
        cond: VarId,
        /// Value when `cond` is set.
        left: VarId,
        /// Value when `cond` is clear.
        right: VarId,
    },
    /// A function call used as a value.
    FunctionCall {
        /// The called function block.
        func: StmtId,
        /// Arguments keyed by port name.
        args: BTreeMap<Ident, VarId>,
    },
    /// A reinterpretation of `parent`.
    Cast {
        /// The cast value.
        parent: VarId,
        /// The cast kind.
        cast: CastKind,
    },
    /// A literal constant.
    Const {
        /// The literal value.
        value: i64,
    },
    /// A named parameter.
    Param(ParamData),
    /// A member of an enum definition.
    EnumConst {
        /// The member value.
        value: i64,
        /// The enum this member belongs to.
        def: EnumId,
    },
    /// A variable typed by an enum definition.
    EnumVar {
        /// The enum type.
        def: EnumId,
    },
    /// A variable typed by a packed struct definition.
    PackedStruct {
        /// The struct type.
        def: StructId,
    },
}

/// A value node.
///
/// `width()` is always recomputed as `var_width × ∏size`, so a parameter
/// update to `var_width` is immediately visible through every accessor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Var {
    /// Local name; empty for anonymous nodes.
    pub name: Ident,
    /// The scope this value belongs to.
    pub scope: ScopeId,
    /// Bits per scalar element.
    pub var_width: u32,
    /// Dimension extents, outermost first. `[1]` for a scalar.
    pub size: Vec<u32>,
    /// Whether the value is signed.
    pub signed: bool,
    /// Declared as an array even though `size == [1]`.
    pub explicit_array: bool,
    /// Declared as a packed array.
    pub packed: bool,
    /// What this value is.
    pub kind: VarKind,
    /// Assignments that drive this value.
    pub sources: BTreeSet<StmtId>,
    /// Assignments that read this value.
    pub sinks: BTreeSet<StmtId>,
    /// Parameter driving `var_width`, if any.
    pub width_param: Option<VarId>,
    /// Host-program locations recorded while the owning scope was in debug mode.
    pub locs: Vec<SourceLoc>,
    #[serde(skip)]
    pub(crate) slices: BTreeMap<SliceKey, VarId>,
    #[serde(skip)]
    pub(crate) concats: Vec<VarId>,
    #[serde(skip)]
    pub(crate) extended: BTreeMap<u32, VarId>,
    #[serde(skip)]
    pub(crate) casted: BTreeMap<CastKind, VarId>,
}

impl Var {
    pub(crate) fn new(
        name: Ident,
        scope: ScopeId,
        var_width: u32,
        size: Vec<u32>,
        signed: bool,
        kind: VarKind,
    ) -> Self {
        Self {
            name,
            scope,
            var_width,
            size: if size.is_empty() { vec![1] } else { size },
            signed,
            explicit_array: false,
            packed: false,
            kind,
            sources: BTreeSet::new(),
            sinks: BTreeSet::new(),
            width_param: None,
            locs: Vec::new(),
            slices: BTreeMap::new(),
            concats: Vec::new(),
            extended: BTreeMap::new(),
            casted: BTreeMap::new(),
        }
    }

    /// Total width in bits: `var_width × ∏size`.
    pub fn width(&self) -> u32 {
        self.size.iter().fold(self.var_width, |w, &s| w * s)
    }

    /// The total width this value would have with `var_width` bits per
    /// element, or `None` when it does not fit in a `u32`.
    pub(crate) fn width_for(&self, var_width: u32) -> Option<u32> {
        total_width(var_width, &self.size)
    }

    /// Dimension extents, outermost first.
    pub fn size(&self) -> &[u32] {
        &self.size
    }

    /// Whether the value is signed.
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// `true` for a single scalar element (`size == [1]`).
    pub fn is_scalar(&self) -> bool {
        self.size == [1]
    }

    /// Coarse classification derived from [`VarKind`].
    pub fn var_type(&self) -> VarType {
        match self.kind {
            VarKind::Base | VarKind::EnumVar { .. } | VarKind::PackedStruct { .. } => VarType::Base,
            VarKind::Port { .. } => VarType::PortIO,
            VarKind::Slice(_) => VarType::Slice,
            VarKind::Expr { .. }
            | VarKind::Concat { .. }
            | VarKind::Extend { .. }
            | VarKind::Conditional { .. }
            | VarKind::FunctionCall { .. } => VarType::Expression,
            VarKind::Cast { .. } => VarType::BaseCasted,
            VarKind::Const { .. } | VarKind::EnumConst { .. } => VarType::ConstValue,
            VarKind::Param(_) => VarType::Parameter,
        }
    }

    /// `true` for module and function ports.
    pub fn is_port(&self) -> bool {
        matches!(self.kind, VarKind::Port { .. })
    }

    /// `true` for literal constants, enum members and parameters.
    pub fn is_const(&self) -> bool {
        matches!(
            self.kind,
            VarKind::Const { .. } | VarKind::EnumConst { .. } | VarKind::Param(_)
        )
    }

    /// `true` for operator nodes and composite views.
    pub fn is_expr(&self) -> bool {
        self.var_type() == VarType::Expression
    }

    /// `true` for enum-typed variables and enum members.
    pub fn is_enum(&self) -> bool {
        self.enum_def().is_some()
    }

    /// The enum definition typing this value, if any.
    pub fn enum_def(&self) -> Option<EnumId> {
        match self.kind {
            VarKind::EnumConst { def, .. } | VarKind::EnumVar { def } => Some(def),
            _ => None,
        }
    }

    /// The literal value of a constant, enum member or parameter.
    pub fn value(&self) -> Option<i64> {
        match &self.kind {
            VarKind::Const { value } | VarKind::EnumConst { value, .. } => Some(*value),
            VarKind::Param(data) => Some(data.value),
            _ => None,
        }
    }

    /// `true` when the width is driven by a parameter.
    pub fn is_parametrized(&self) -> bool {
        self.width_param.is_some()
    }
}

/// Declaration of a named variable or port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarDecl {
    name: String,
    width: u32,
    size: Vec<u32>,
    signed: bool,
    explicit_array: bool,
    packed: bool,
}

impl VarDecl {
    /// An unsigned scalar of `width` bits.
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            size: vec![1],
            signed: false,
            explicit_array: false,
            packed: false,
        }
    }

    /// Marks the declaration signed.
    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Sets the dimension extents, outermost first.
    pub fn array(mut self, size: &[u32]) -> Self {
        self.size = size.to_vec();
        self
    }

    /// Keeps array semantics even for a single element.
    pub fn explicit_array(mut self) -> Self {
        self.explicit_array = true;
        self
    }

    /// Declares a packed array.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }
}

/// One member of a packed struct, laid out from bit 0 upwards in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMember {
    /// Member name.
    pub name: Ident,
    /// Member width in bits.
    pub width: u32,
    /// Whether the member is signed.
    pub signed: bool,
}

/// A packed struct type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    /// Type name.
    pub name: Ident,
    /// Members in declaration order.
    pub members: Vec<StructMember>,
}

impl StructDef {
    /// Sum of all member widths.
    pub fn width(&self) -> u32 {
        self.members.iter().map(|m| m.width).sum()
    }
}

impl Context {
    /// Declares a variable in `scope`.
    #[track_caller]
    pub fn declare_var(&mut self, scope: ScopeId, decl: VarDecl) -> IrResult<VarId> {
        let loc = self.caller_loc(scope);
        self.declare(scope, decl, VarKind::Base, loc)
    }

    /// Declares a port of `scope`.
    #[track_caller]
    pub fn declare_port(
        &mut self,
        scope: ScopeId,
        direction: PortDirection,
        decl: VarDecl,
    ) -> IrResult<VarId> {
        let loc = self.caller_loc(scope);
        self.declare(scope, decl, VarKind::Port { direction }, loc)
    }

    /// Registers a packed struct type.
    pub fn add_packed_struct(
        &mut self,
        name: &str,
        members: &[(&str, u32, bool)],
    ) -> IrResult<StructId> {
        let mut seen = BTreeSet::new();
        let mut fields = Vec::with_capacity(members.len());
        for &(member, width, signed) in members {
            if width == 0 {
                return Err(IrError::user(format!(
                    "{member} in struct {name} cannot have zero width"
                )));
            }
            if !seen.insert(member) {
                return Err(IrError::user(format!(
                    "{member} already exists in struct {name}"
                )));
            }
            fields.push(StructMember {
                name: self.intern(member),
                width,
                signed,
            });
        }
        let def = StructDef {
            name: self.intern(name),
            members: fields,
        };
        Ok(self.structs.alloc(def))
    }

    /// Declares a variable typed by a packed struct.
    #[track_caller]
    pub fn declare_packed_struct(
        &mut self,
        scope: ScopeId,
        name: &str,
        def: StructId,
    ) -> IrResult<VarId> {
        let loc = self.caller_loc(scope);
        let decl = VarDecl::new(name, self.structs[def].width()).packed();
        self.declare(scope, decl, VarKind::PackedStruct { def }, loc)
    }

    pub(crate) fn declare(
        &mut self,
        scope: ScopeId,
        decl: VarDecl,
        kind: VarKind,
        loc: Option<SourceLoc>,
    ) -> IrResult<VarId> {
        if scope == self.const_scope() {
            return Err(IrError::user(format!(
                "{} cannot be declared in the constant scope",
                decl.name
            )));
        }
        if decl.width == 0 || decl.size.contains(&0) {
            return Err(IrError::user(format!("{} cannot have zero width", decl.name)));
        }
        if total_width(decl.width, &decl.size).is_none() {
            return Err(IrError::user(format!(
                "{} is wider than {} bits",
                decl.name,
                u32::MAX
            )));
        }
        let name = self.check_new_name(scope, &decl.name)?;
        let mut var = Var::new(name, scope, decl.width, decl.size, decl.signed, kind);
        var.explicit_array = decl.explicit_array;
        var.packed = decl.packed;
        var.locs.extend(loc);
        let id = self.vars.alloc(var);
        self.scope_mut(scope).insert_var(name, id);
        Ok(id)
    }
}

/// `var_width × ∏size`, or `None` on overflow.
pub(crate) fn total_width(var_width: u32, size: &[u32]) -> Option<u32> {
    size.iter().try_fold(var_width, |w, &s| w.checked_mul(s))
}
