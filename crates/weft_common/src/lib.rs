//! Shared foundations for the Weft hardware-construction IR.
//!
//! This crate provides interned identifiers, source locations captured at node
//! creation time, and the internal error type used to flag broken invariants.

#![warn(missing_docs)]

pub mod ident;
pub mod loc;
pub mod result;

pub use ident::{Ident, Interner};
pub use loc::SourceLoc;
pub use result::{InternalError, InternalResult};
