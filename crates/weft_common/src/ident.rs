//! Interned names for variables, scopes, functions and enum members.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name.
///
/// Every name in the IR (variable, port, scope, function, enum member) is a
/// `u32` key into the [`Interner`] owned by the construction context, which
/// makes name comparison and copying free.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw index. Intended for tests and deserialization.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`; `try_from_usize` rejects values that don't fit.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// String interner backed by [`lasso::ThreadedRodeo`].
///
/// The empty string is interned on construction so anonymous nodes (slices,
/// expressions, the default constant scope) share [`Interner::empty`].
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
    empty: Ident,
}

impl Interner {
    /// Creates a new interner.
    pub fn new() -> Self {
        let rodeo = ThreadedRodeo::new();
        let empty = rodeo.get_or_intern_static("");
        Self { rodeo, empty }
    }

    /// Interns a string, returning the existing key when already present.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Looks up a string without interning it.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// Resolves an [`Ident`] back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// The key of the empty name.
    pub fn empty(&self) -> Ident {
        self.empty
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.rodeo.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.get_or_intern("clk");
        assert_eq!(interner.resolve(id), "clk");
    }

    #[test]
    fn same_name_same_ident() {
        let interner = Interner::new();
        assert_eq!(interner.get_or_intern("rst"), interner.get_or_intern("rst"));
    }

    #[test]
    fn empty_is_preinterned() {
        let interner = Interner::new();
        assert_eq!(interner.get_or_intern(""), interner.empty());
        assert_eq!(interner.resolve(interner.empty()), "");
    }

    #[test]
    fn get_does_not_intern() {
        let interner = Interner::new();
        assert!(interner.get("data_out").is_none());
        let id = interner.get_or_intern("data_out");
        assert_eq!(interner.get("data_out"), Some(id));
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
