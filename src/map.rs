//! Map: typed facade over [`RawTable`] with element counting and growth.
//!
//! Keys are hashed with `S: BuildHasher` (FNV-1a by default) and truncated to
//! the engine's 32-bit hash. After an insert that reaches the 70% load factor
//! the table grows immediately, so `len * 100 < capacity * 70` holds between
//! calls.
//!
//! The `*_with_hash` methods take the hash and an equality predicate from the
//! caller and carry no `K: Hash` bound. The pools use them to key tables by
//! handles whose content lives elsewhere.

use crate::guard::BusyFlag;
use crate::hash::{make_hash, FnvBuildHasher};
use crate::table::{self, RawTable};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};

/// Capacity requested by `new()`, before rounding to a prime.
pub const DEFAULT_CAPACITY: usize = 4;

pub struct Map<K, V, S = FnvBuildHasher> {
    table: RawTable<K, V>,
    len: usize,
    hasher: S,
    busy: BusyFlag,
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, FnvBuildHasher)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FnvBuildHasher)
    }
}

impl<K, V, S: Default> Default for Map<K, V, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default())
    }
}

impl<K, V, S> Map<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            table: RawTable::with_capacity(capacity),
            len: 0,
            hasher,
            busy: BusyFlag::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Drops every entry; the allocation is kept.
    pub fn clear(&mut self) {
        let _g = self.busy.enter();
        // The table is empty afterwards even if a destructor panics.
        self.len = 0;
        self.table.clear();
    }

    /// Inserts with a caller-supplied hash and key equality.
    ///
    /// Returns `false` (dropping `key` and `value`) if `eq(stored, &key)`
    /// holds for a stored key with the same hash.
    pub fn insert_with_hash(
        &mut self,
        hash: u32,
        key: K,
        value: V,
        eq: impl FnMut(&K, &K) -> bool,
    ) -> bool {
        let _g = self.busy.enter();
        if !self.table.insert(hash, key, value, eq) {
            return false;
        }
        self.len += 1;
        if self.table.needs_rehash(self.len) {
            self.table.grow();
        }
        true
    }

    /// Looks up with a caller-supplied hash and predicate.
    pub fn find_with_hash(&self, hash: u32, eq: impl FnMut(&K) -> bool) -> Option<(&K, &V)> {
        let _g = self.busy.enter();
        let idx = self.table.find(hash, eq)?;
        Some(self.table.entry_at(idx))
    }

    /// Mutable lookup with a caller-supplied hash and predicate.
    pub fn find_mut_with_hash(&mut self, hash: u32, eq: impl FnMut(&K) -> bool) -> Option<&mut V> {
        let _g = self.busy.enter();
        let idx = self.table.find(hash, eq)?;
        Some(self.table.value_at_mut(idx))
    }

    /// Removes with a caller-supplied hash and predicate.
    pub fn remove_with_hash(&mut self, hash: u32, eq: impl FnMut(&K) -> bool) -> Option<(K, V)> {
        let _g = self.busy.enter();
        let entry = self.table.remove(hash, eq)?;
        self.len -= 1;
        Some(entry)
    }

    /// Entries in bucket order (not insertion order).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
            remaining: self.len,
        }
    }

    /// Entries in bucket order, values mutable.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Inserts `key -> value` if `key` is absent. An existing entry is left
    /// untouched and `false` is returned.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = make_hash(&self.hasher, &key);
        self.insert_with_hash(hash, key, value, |stored, new| stored == new)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_key_value(q).map(|(_, v)| v)
    }

    pub fn find_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = make_hash(&self.hasher, q);
        self.find_with_hash(hash, |k| k.borrow() == q)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = make_hash(&self.hasher, q);
        self.find_mut_with_hash(hash, |k| k.borrow() == q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_key_value(q).is_some()
    }

    /// Removes `q`'s entry; returns whether one was present.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).is_some()
    }

    /// Removes and returns `q`'s entry.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = make_hash(&self.hasher, q);
        self.remove_with_hash(hash, |k| k.borrow() == q)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Map<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for Map<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

impl<'a, K, V, S> IntoIterator for &'a Map<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`Map`].
pub struct Iter<'a, K, V> {
    inner: table::Iter<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            remaining: self.remaining,
        }
    }
}

/// Iterator over the entries of a [`Map`] with mutable values.
pub struct IterMut<'a, K, V> {
    inner: table::IterMut<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
