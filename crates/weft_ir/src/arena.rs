//! Append-only, id-indexed node storage.
//!
//! Every value, statement and scope lives in an [`Arena`] owned by the
//! [`Context`](crate::context::Context). Cross references between nodes are
//! plain ids, so the cyclic parent/child/cache links of the graph never need
//! shared ownership.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// An opaque `u32` handle into an [`Arena`].
pub trait ArenaId: Copy {
    /// Builds the id of the `index`-th allocation.
    fn from_raw(index: u32) -> Self;

    /// The allocation index.
    fn as_raw(self) -> u32;
}

/// Dense storage of `T` addressed by `I`.
///
/// Nodes are never freed; detaching a node from the graph only removes the
/// edges that point at it. An id therefore stays valid for the life of the
/// arena that produced it, and indexing with a foreign id panics.
pub struct Arena<I, T> {
    items: Vec<T>,
    _id: PhantomData<fn() -> I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `item` and returns its id.
    pub fn alloc(&mut self, item: T) -> I {
        let index = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
        self.items.push(item);
        I::from_raw(index)
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T: fmt::Debug> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{StmtId, VarId};

    #[test]
    fn ids_follow_allocation_order() {
        let mut arena: Arena<VarId, &str> = Arena::new();
        assert!(arena.is_empty());
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!((a.as_raw(), b.as_raw()), (0, 1));
        assert_eq!(arena[b], "b");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn nodes_update_in_place() {
        let mut arena: Arena<StmtId, Vec<u32>> = Arena::default();
        let id = arena.alloc(vec![1]);
        arena[id].push(2);
        assert_eq!(arena[id], vec![1, 2]);
    }
}
