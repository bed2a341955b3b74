//! ImmutableSetPool: hash-consed, sorted, duplicate-free sets.
//!
//! Every set the pool hands out is canonical (ascending per `T: Ord`, no
//! duplicates) and unique: two inserts with the same content, in any order
//! and with any repetition, return the same [`SetHandle`]. Comparing handles
//! is therefore comparing contents.
//!
//! Layout mirrors an arena plus index:
//! - `slots`: generational arena owning every canonical [`ImmutableSet`].
//! - `index`: a [`Set`] of arena keys, hashed and compared by the content of
//!   the set each key points to, through the hash-explicit `Set` API.
//!
//! Instances are never freed one at a time. `reset` drops all of them at
//! once; handles from before the reset stop resolving.

use crate::hash::{make_hash, FnvBuildHasher};
use crate::set::Set;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use slotmap::{DefaultKey, SlotMap};

/// A canonical set: ascending, duplicate-free elements.
pub struct ImmutableSet<T> {
    elems: Box<[T]>,
}

impl<T> ImmutableSet<T> {
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.elems
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Elements in ascending order.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.elems.iter()
    }
}

impl<T: Ord> ImmutableSet<T> {
    /// The stored element equal to `elem`, by binary search.
    pub fn find(&self, elem: &T) -> Option<&T> {
        self.elems
            .binary_search(elem)
            .ok()
            .map(|i| &self.elems[i])
    }

    pub fn contains(&self, elem: &T) -> bool {
        self.elems.binary_search(elem).is_ok()
    }
}

impl<'a, T> IntoIterator for &'a ImmutableSet<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elems.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for ImmutableSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.elems.iter()).finish()
    }
}

/// Identity of a pooled set. Equal handles from the same pool mean equal
/// contents, and vice versa.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SetHandle(DefaultKey);

impl SetHandle {
    /// The pooled set, or `None` if the pool was reset since.
    pub fn get<'a, T, S>(&self, pool: &'a ImmutableSetPool<T, S>) -> Option<&'a ImmutableSet<T>> {
        pool.get(*self)
    }

    pub fn elems<'a, T, S>(&self, pool: &'a ImmutableSetPool<T, S>) -> Option<&'a [T]> {
        pool.get(*self).map(ImmutableSet::as_slice)
    }
}

pub struct ImmutableSetPool<T, S = FnvBuildHasher> {
    hasher: S,
    index: Set<DefaultKey>,
    slots: SlotMap<DefaultKey, ImmutableSet<T>>,
}

impl<T> ImmutableSetPool<T> {
    pub fn new() -> Self {
        Self::with_hasher(FnvBuildHasher)
    }
}

impl<T> Default for ImmutableSetPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> ImmutableSetPool<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: Set::new(),
            slots: SlotMap::with_key(),
        }
    }

    /// Number of distinct sets in the pool.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, handle: SetHandle) -> Option<&ImmutableSet<T>> {
        self.slots.get(handle.0)
    }

    /// Every pooled set, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (SetHandle, &ImmutableSet<T>)> + '_ {
        self.slots.iter().map(|(k, s)| (SetHandle(k), s))
    }

    /// Frees every pooled set. The pool stays usable; old handles no longer
    /// resolve.
    pub fn reset(&mut self) {
        log::debug!("immutable set pool reset: releasing {} sets", self.slots.len());
        self.index.clear();
        self.slots.clear();
    }
}

impl<T, S> ImmutableSetPool<T, S>
where
    T: Ord + Hash,
    S: BuildHasher,
{
    /// Pools the set of `elems`, in any order and with any repetition.
    pub fn insert<I>(&mut self, elems: I) -> SetHandle
    where
        I: IntoIterator<Item = T>,
    {
        let mut elems: Vec<T> = elems.into_iter().collect();
        elems.sort_unstable();
        elems.dedup();
        self.intern(elems)
    }

    /// Stored element of the pooled set equal to `elem`.
    pub fn find(&self, set: SetHandle, elem: &T) -> Option<&T> {
        self.get(set)?.find(elem)
    }

    fn content_hash(&self, elems: &[T]) -> u32 {
        make_hash(&self.hasher, elems)
    }

    fn lookup(&self, hash: u32, elems: &[T]) -> Option<SetHandle> {
        let slots = &self.slots;
        self.index
            .find_with_hash(hash, |&key| slots[key].as_slice() == elems)
            .map(|&key| SetHandle(key))
    }

    fn store(&mut self, hash: u32, elems: Box<[T]>) -> SetHandle {
        let key = self.slots.insert(ImmutableSet { elems });
        let slots = &self.slots;
        let inserted = self
            .index
            .insert_with_hash(hash, key, |a, b| slots[*a].as_slice() == slots[*b].as_slice());
        debug_assert!(inserted, "set content already pooled under another key");
        SetHandle(key)
    }

    fn intern(&mut self, elems: Vec<T>) -> SetHandle {
        debug_assert!(is_canonical(&elems), "set elements are not sorted and unique");
        let hash = self.content_hash(&elems);
        match self.lookup(hash, &elems) {
            Some(found) => found,
            None => self.store(hash, elems.into_boxed_slice()),
        }
    }
}

impl<T, S> ImmutableSetPool<T, S>
where
    T: Ord + Hash + Clone,
    S: BuildHasher,
{
    /// Sorts `buf` in place, compacts its distinct elements to the front, and
    /// pools them. The tail of `buf` is left in unspecified order.
    pub fn insert_buffer(&mut self, buf: &mut [T]) -> SetHandle {
        buf.sort_unstable();
        let mut unique = 0;
        for i in 0..buf.len() {
            if unique == 0 || buf[i] != buf[unique - 1] {
                buf.swap(unique, i);
                unique += 1;
            }
        }
        self.insert_sorted(&buf[..unique])
    }

    /// Pools `elems`, which must already be strictly ascending. The order is
    /// only checked in debug builds. Nothing is copied if the set is pooled
    /// already.
    pub fn insert_sorted(&mut self, elems: &[T]) -> SetHandle {
        debug_assert!(is_canonical(elems), "set elements are not sorted and unique");
        let hash = self.content_hash(elems);
        match self.lookup(hash, elems) {
            Some(found) => found,
            None => self.store(hash, elems.into()),
        }
    }

    /// Pooled union of two pooled sets, by a linear merge of both.
    ///
    /// # Panics
    /// Panics if either handle no longer resolves in this pool.
    pub fn merge(&mut self, a: SetHandle, b: SetHandle) -> SetHandle {
        let merged = merge_sorted(self.slots[a.0].as_slice(), self.slots[b.0].as_slice());
        self.intern(merged)
    }
}

impl<T: fmt::Debug, S> fmt::Debug for ImmutableSetPool<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

fn is_canonical<T: Ord>(elems: &[T]) -> bool {
    elems.windows(2).all(|w| w[0] < w[1])
}

/// Union of two ascending, duplicate-free slices.
fn merge_sorted<T: Ord + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
