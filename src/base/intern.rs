//! Atom table: interning for variable-length text referenced by facts.
//!
//! Facts are fixed-size records, so any text they assert (names, type
//! spellings) is stored here once and referenced by a dense `AtomId` that
//! fits in the 8-byte fact payload. Interning the same string twice
//! returns the same id.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Dense identifier for an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct AtomId(u32);

impl AtomId {
    pub fn to_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(raw: u32) -> Self {
        Self(raw)
    }
}

/// String interner handing out dense ids.
#[derive(Debug, Default, Clone)]
pub struct AtomTable {
    atoms: Vec<SmolStr>,
    lookup: FxHashMap<SmolStr, AtomId>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its id.
    ///
    /// If the string was already interned, returns the existing id.
    pub fn intern(&mut self, text: &str) -> AtomId {
        if let Some(&id) = self.lookup.get(text) {
            return id;
        }
        let id = AtomId(self.atoms.len() as u32);
        let atom = SmolStr::new(text);
        self.atoms.push(atom.clone());
        self.lookup.insert(atom, id);
        id
    }

    /// Resolve an id back to its text.
    pub fn resolve(&self, id: AtomId) -> Option<&str> {
        self.atoms.get(id.0 as usize).map(|s| s.as_str())
    }

    /// Get an id without interning.
    pub fn get(&self, text: &str) -> Option<AtomId> {
        self.lookup.get(text).copied()
    }

    /// Number of unique atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_id() {
        let mut atoms = AtomTable::new();
        let a = atoms.intern("main");
        let b = atoms.intern("main");
        assert_eq!(a, b);
        assert_eq!(atoms.len(), 1);
    }

    #[test]
    fn test_ids_are_dense() {
        let mut atoms = AtomTable::new();
        let a = atoms.intern("one");
        let b = atoms.intern("two");
        assert_eq!(a.to_u32(), 0);
        assert_eq!(b.to_u32(), 1);
    }

    #[test]
    fn test_resolve() {
        let mut atoms = AtomTable::new();
        let id = atoms.intern("answer");
        assert_eq!(atoms.resolve(id), Some("answer"));
        assert_eq!(atoms.resolve(AtomId::from_u32(99)), None);
    }

    #[test]
    fn test_get_without_interning() {
        let mut atoms = AtomTable::new();
        atoms.intern("exists");
        assert!(atoms.get("exists").is_some());
        assert!(atoms.get("missing").is_none());
        assert_eq!(atoms.len(), 1);
    }
}
