//! StrPool: string interning on top of [`Set`].
//!
//! Each distinct string is stored once; interning it again returns the same
//! [`Symbol`], so symbol equality is string equality.

use crate::hash::{hash_str, FNV_SEED};
use crate::set::Set;

/// Interned string id, valid for the pool that produced it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Position of the string in interning order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Default)]
pub struct StrPool {
    index: Set<Symbol>,
    strings: Vec<Box<str>>,
}

impl StrPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Symbol for `s`, storing a copy the first time `s` is seen.
    ///
    /// # Panics
    /// Panics once `u32::MAX` distinct strings have been interned.
    pub fn intern(&mut self, s: &str) -> Symbol {
        let hash = hash_str(FNV_SEED, s);
        if let Some(sym) = self.lookup(hash, s) {
            return sym;
        }
        assert!(
            self.strings.len() < u32::MAX as usize,
            "string pool is full"
        );
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        let strings = &self.strings;
        let inserted = self.index.insert_with_hash(hash, sym, |a, b| {
            strings[a.index()] == strings[b.index()]
        });
        debug_assert!(inserted);
        sym
    }

    /// Symbol for `s` if it was interned before.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.lookup(hash_str(FNV_SEED, s), s)
    }

    /// The string behind `sym`, or `None` for a symbol from another pool.
    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.get(sym.index()).map(|s| &**s)
    }

    /// `(symbol, string)` pairs in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> + '_ {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), &**s))
    }

    fn lookup(&self, hash: u32, s: &str) -> Option<Symbol> {
        let strings = &self.strings;
        self.index
            .find_with_hash(hash, |sym| &*strings[sym.index()] == s)
            .copied()
    }
}

impl core::fmt::Debug for StrPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.strings.iter()).finish()
    }
}
