//! Set: a [`Map`] with unit values.

use crate::hash::FnvBuildHasher;
use crate::map::{self, Map, DEFAULT_CAPACITY};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};

pub struct Set<T, S = FnvBuildHasher> {
    map: Map<T, (), S>,
}

impl<T> Set<T> {
    pub fn new() -> Self {
        Self { map: Map::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: Map::with_capacity(capacity),
        }
    }
}

impl<T, S: Default> Default for Set<T, S> {
    fn default() -> Self {
        Self {
            map: Map::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default()),
        }
    }
}

impl<T, S> Set<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: Map::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: Map::with_capacity_and_hasher(capacity, hasher),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Removes every element; the allocation is kept.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn insert_with_hash(&mut self, hash: u32, value: T, eq: impl FnMut(&T, &T) -> bool) -> bool {
        self.map.insert_with_hash(hash, value, (), eq)
    }

    pub fn find_with_hash(&self, hash: u32, eq: impl FnMut(&T) -> bool) -> Option<&T> {
        self.map.find_with_hash(hash, eq).map(|(k, _)| k)
    }

    pub fn remove_with_hash(&mut self, hash: u32, eq: impl FnMut(&T) -> bool) -> Option<T> {
        self.map.remove_with_hash(hash, eq).map(|(k, ())| k)
    }

    /// Elements in bucket order (not insertion order).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.map.iter(),
        }
    }
}

impl<T, S> Set<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    /// Adds `value`; returns `false` if an equal element was already present.
    pub fn insert(&mut self, value: T) -> bool {
        self.map.insert(value, ())
    }

    /// The stored element equal to `q`.
    pub fn find<Q>(&self, q: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.find_key_value(q).map(|(k, _)| k)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(q)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove(q)
    }

    /// Removes and returns the stored element equal to `q`.
    pub fn take<Q>(&mut self, q: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove_entry(q).map(|(k, ())| k)
    }
}

impl<T: fmt::Debug, S> fmt::Debug for Set<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<T> for Set<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

impl<T, S> FromIterator<T> for Set<T, S>
where
    T: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut s = Self::default();
        s.extend(iter);
        s
    }
}

impl<'a, T, S> IntoIterator for &'a Set<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a [`Set`].
pub struct Iter<'a, T> {
    inner: map::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
