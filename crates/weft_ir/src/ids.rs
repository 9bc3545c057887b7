//! Typed handles for IR nodes.
//!
//! Ids order by allocation, which is what makes the edge sets on a value
//! (`BTreeSet<StmtId>`) iterate in statement creation order.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// The id of the `index`-th allocation.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// The allocation index.
            pub const fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                $name::from_raw(index)
            }

            fn as_raw(self) -> u32 {
                $name::as_raw(self)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a value node (variable, port, slice, expression, constant, ...).
    VarId
);

define_id!(
    /// Opaque, copyable ID for a statement.
    StmtId
);

define_id!(
    /// Opaque, copyable ID for an owning scope.
    ScopeId
);

define_id!(
    /// Opaque, copyable ID for an enum definition.
    EnumId
);

define_id!(
    /// Opaque, copyable ID for a packed struct definition.
    StructId
);
