//! RawTable: the open-addressing engine under `Map` and `Set`.
//!
//! Layout
//! - `hashes[i]` is `0` for an empty bucket, else the key's 32-bit hash with
//!   [`OCCUPIED`] or-ed in. `keys[i]`/`values[i]` are initialized exactly
//!   when `hashes[i]` is occupied.
//! - Sets instantiate `V = ()`, so the values block never allocates.
//!
//! Probing
//! - Linear probing from `ideal(hash) = (hash | OCCUPIED) mod capacity`,
//!   wrapping at the end of the table.
//! - Callers pass the hash and an equality predicate on every operation; the
//!   engine never hashes keys. Rehashing reuses the stored hashes.
//! - `insert` never grows. Growth policy belongs to the caller, which checks
//!   [`RawTable::needs_rehash`] and calls [`RawTable::grow`].
//!
//! Deletion
//! - No tombstones. `remove` backward-shifts the rest of the cluster so every
//!   remaining key is still reachable by its own probe sequence.

use crate::primes::{mod_prime, next_prime, MAX_PRIME};
use core::fmt;
use core::mem::MaybeUninit;

/// Occupancy flag stored in the top bit of every live hash.
pub const OCCUPIED: u32 = 0x8000_0000;
/// Maximum load factor, in percent.
pub const MAX_LOAD_FACTOR: usize = 70;

pub struct RawTable<K, V> {
    hashes: Box<[u32]>,
    keys: Box<[MaybeUninit<K>]>,
    values: Box<[MaybeUninit<V>]>,
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Exhausted,
}

fn uninit_block<T>(len: usize) -> Box<[MaybeUninit<T>]> {
    (0..len).map(|_| MaybeUninit::uninit()).collect()
}

/// Backward-shift test: with the hole at `freed` and an occupied bucket at
/// `scan` whose ideal bucket is `ideal`, the entry may move into the hole iff
/// `ideal` is not in the cyclic interval `(freed, scan]`.
#[inline]
pub fn should_shift(freed: usize, scan: usize, ideal: usize) -> bool {
    (scan > freed && (ideal <= freed || ideal > scan))
        || (scan < freed && (ideal <= freed && ideal > scan))
}

impl<K, V> RawTable<K, V> {
    /// Creates an empty table whose capacity is `initial_capacity` rounded up
    /// to the next tabulated prime.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = next_prime(initial_capacity);
        Self {
            hashes: vec![0u32; capacity].into_boxed_slice(),
            keys: uninit_block(capacity),
            values: uninit_block(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.hashes.len()
    }

    #[inline]
    pub fn is_occupied(&self, idx: usize) -> bool {
        self.hashes[idx] & OCCUPIED != 0
    }

    /// Successor bucket, wrapping to 0.
    #[inline]
    pub fn next_bucket(&self, idx: usize) -> usize {
        if idx + 1 < self.capacity() {
            idx + 1
        } else {
            0
        }
    }

    /// True once `count` entries reach the maximum load factor.
    #[inline]
    pub fn needs_rehash(&self, count: usize) -> bool {
        count * 100 >= self.capacity() * MAX_LOAD_FACTOR
    }

    /// Bucket where probing for `hash` starts.
    #[inline]
    pub fn ideal_bucket(&self, hash: u32) -> usize {
        mod_prime((hash | OCCUPIED) as usize, self.capacity())
    }

    /// Stored hash at `idx` (occupancy bit included), or 0 when empty.
    #[inline]
    pub fn hash_at(&self, idx: usize) -> u32 {
        self.hashes[idx]
    }

    /// Number of occupied buckets. O(capacity); the facade tracks its own count.
    pub fn occupied(&self) -> usize {
        self.hashes.iter().filter(|&&h| h & OCCUPIED != 0).count()
    }

    fn probe(&self, hash: u32, mut eq: impl FnMut(&K) -> bool) -> Probe {
        let hash = hash | OCCUPIED;
        let mut idx = self.ideal_bucket(hash);
        for _ in 0..self.capacity() {
            if !self.is_occupied(idx) {
                return Probe::Vacant(idx);
            }
            // SAFETY: occupied buckets hold an initialized key.
            if self.hashes[idx] == hash && eq(unsafe { self.keys[idx].assume_init_ref() }) {
                return Probe::Found(idx);
            }
            idx = self.next_bucket(idx);
        }
        Probe::Exhausted
    }

    /// Inserts `key -> value` unless an equal key is present.
    ///
    /// Returns `false` without touching the table (and drops `key`/`value`)
    /// when `eq(stored, &key)` holds for some stored key with the same hash.
    ///
    /// # Panics
    /// Panics if the table has no empty bucket left.
    pub fn insert(
        &mut self,
        hash: u32,
        key: K,
        value: V,
        mut eq: impl FnMut(&K, &K) -> bool,
    ) -> bool {
        let probe = self.probe(hash, |stored| eq(stored, &key));
        match probe {
            Probe::Found(_) => false,
            Probe::Vacant(idx) => {
                self.write(idx, hash | OCCUPIED, key, value);
                true
            }
            Probe::Exhausted => panic!("insert into a full hash table"),
        }
    }

    /// Index of the occupied bucket holding a key with this hash that
    /// satisfies `eq`.
    pub fn find(&self, hash: u32, eq: impl FnMut(&K) -> bool) -> Option<usize> {
        match self.probe(hash, eq) {
            Probe::Found(idx) => Some(idx),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Removes the matching entry and closes the gap by backward shifting.
    pub fn remove(&mut self, hash: u32, eq: impl FnMut(&K) -> bool) -> Option<(K, V)> {
        let mut freed = match self.probe(hash, eq) {
            Probe::Found(idx) => idx,
            Probe::Vacant(_) | Probe::Exhausted => return None,
        };
        // SAFETY: `freed` was found occupied; `take` marks it empty.
        let entry = unsafe { self.take(freed) };

        let mut scan = self.next_bucket(freed);
        while self.is_occupied(scan) {
            let ideal = self.ideal_bucket(self.hashes[scan]);
            if should_shift(freed, scan, ideal) {
                // SAFETY: `scan` is occupied and `freed` is empty.
                unsafe { self.relocate(scan, freed) };
                freed = scan;
            }
            scan = self.next_bucket(scan);
        }
        debug_assert!(!self.is_occupied(freed));
        Some(entry)
    }

    /// Drops every entry and marks all buckets empty; keeps the allocation.
    ///
    /// If an entry's destructor panics, the table is still left empty and
    /// the entries not yet dropped are leaked.
    pub fn clear(&mut self) {
        struct EmptyOnExit<'a>(&'a mut [u32]);
        impl Drop for EmptyOnExit<'_> {
            fn drop(&mut self) {
                self.0.fill(0);
            }
        }

        let hashes = EmptyOnExit(&mut self.hashes);
        if !core::mem::needs_drop::<K>() && !core::mem::needs_drop::<V>() {
            return;
        }
        for (idx, &hash) in hashes.0.iter().enumerate() {
            if hash & OCCUPIED != 0 {
                // SAFETY: occupied buckets are initialized, and `hashes`
                // marks every bucket empty before the table is used again.
                unsafe {
                    self.keys[idx].assume_init_drop();
                    self.values[idx].assume_init_drop();
                }
            }
        }
    }

    /// Moves every entry into a fresh table of (at least) `capacity` buckets.
    ///
    /// # Panics
    /// Panics if `capacity` cannot hold the current entries.
    pub fn rehash(&mut self, capacity: usize) {
        let capacity = next_prime(capacity);
        // Checked up front so a failed rehash leaves every entry in place.
        assert!(self.occupied() <= capacity, "rehash target too small");
        let mut fresh = RawTable::with_capacity(capacity);
        for idx in 0..self.capacity() {
            if !self.is_occupied(idx) {
                continue;
            }
            let hash = self.hashes[idx];
            // SAFETY: occupied; `take` empties the source bucket.
            let (key, value) = unsafe { self.take(idx) };
            let mut dst = fresh.ideal_bucket(hash);
            while fresh.is_occupied(dst) {
                dst = fresh.next_bucket(dst);
            }
            fresh.write(dst, hash, key, value);
        }
        // Old storage is all-empty now, so dropping it frees memory only.
        *self = fresh;
    }

    /// Rehashes into the next tabulated prime, or 1.5x the capacity once past
    /// the largest prime.
    pub fn grow(&mut self) {
        let capacity = self.capacity();
        let next = if capacity < MAX_PRIME {
            next_prime(capacity + 1)
        } else {
            capacity + (capacity >> 1)
        };
        log::trace!("hash table grow: {} -> {} buckets", capacity, next);
        self.rehash(next);
    }

    /// Key stored at an occupied bucket.
    ///
    /// # Panics
    /// Panics if the bucket is empty.
    pub fn key_at(&self, idx: usize) -> &K {
        assert!(self.is_occupied(idx), "bucket {} is empty", idx);
        // SAFETY: checked occupied.
        unsafe { self.keys[idx].assume_init_ref() }
    }

    /// Value stored at an occupied bucket.
    ///
    /// # Panics
    /// Panics if the bucket is empty.
    pub fn value_at(&self, idx: usize) -> &V {
        assert!(self.is_occupied(idx), "bucket {} is empty", idx);
        // SAFETY: checked occupied.
        unsafe { self.values[idx].assume_init_ref() }
    }

    /// Mutable value stored at an occupied bucket.
    ///
    /// # Panics
    /// Panics if the bucket is empty.
    pub fn value_at_mut(&mut self, idx: usize) -> &mut V {
        assert!(self.is_occupied(idx), "bucket {} is empty", idx);
        // SAFETY: checked occupied.
        unsafe { self.values[idx].assume_init_mut() }
    }

    /// Key and value stored at an occupied bucket.
    pub fn entry_at(&self, idx: usize) -> (&K, &V) {
        (self.key_at(idx), self.value_at(idx))
    }

    /// Occupied entries in bucket order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self
                .hashes
                .iter()
                .zip(self.keys.iter())
                .zip(self.values.iter()),
        }
    }

    /// Occupied entries in bucket order, values mutable.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self
                .hashes
                .iter()
                .zip(self.keys.iter())
                .zip(self.values.iter_mut()),
        }
    }

    fn write(&mut self, idx: usize, stored_hash: u32, key: K, value: V) {
        debug_assert!(stored_hash & OCCUPIED != 0);
        debug_assert!(!self.is_occupied(idx));
        self.keys[idx].write(key);
        self.values[idx].write(value);
        self.hashes[idx] = stored_hash;
    }

    /// Moves the entry out of `idx` and marks the bucket empty.
    ///
    /// # Safety
    /// `idx` must be occupied.
    unsafe fn take(&mut self, idx: usize) -> (K, V) {
        debug_assert!(self.is_occupied(idx));
        self.hashes[idx] = 0;
        (
            self.keys[idx].assume_init_read(),
            self.values[idx].assume_init_read(),
        )
    }

    /// Moves the entry at `src` into the empty bucket `dst`.
    ///
    /// # Safety
    /// `src` must be occupied and `dst` empty.
    unsafe fn relocate(&mut self, src: usize, dst: usize) {
        debug_assert!(self.is_occupied(src) && !self.is_occupied(dst));
        let key = self.keys[src].assume_init_read();
        let value = self.values[src].assume_init_read();
        self.keys[dst].write(key);
        self.values[dst].write(value);
        self.hashes[dst] = self.hashes[src];
        self.hashes[src] = 0;
    }
}

impl<K, V> Drop for RawTable<K, V> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>() {
            self.clear();
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RawTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

type Buckets<'a, K, V> = core::iter::Zip<
    core::iter::Zip<core::slice::Iter<'a, u32>, core::slice::Iter<'a, MaybeUninit<K>>>,
    core::slice::Iter<'a, MaybeUninit<V>>,
>;

type BucketsMut<'a, K, V> = core::iter::Zip<
    core::iter::Zip<core::slice::Iter<'a, u32>, core::slice::Iter<'a, MaybeUninit<K>>>,
    core::slice::IterMut<'a, MaybeUninit<V>>,
>;

/// Iterator over occupied buckets of a [`RawTable`].
pub struct Iter<'a, K, V> {
    inner: Buckets<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ((&hash, key), value) = self.inner.next()?;
            if hash & OCCUPIED != 0 {
                // SAFETY: occupied buckets are initialized.
                return Some(unsafe { (key.assume_init_ref(), value.assume_init_ref()) });
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Mutable-value iterator over occupied buckets of a [`RawTable`].
pub struct IterMut<'a, K, V> {
    inner: BucketsMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ((&hash, key), value) = self.inner.next()?;
            if hash & OCCUPIED != 0 {
                // SAFETY: occupied buckets are initialized.
                return Some(unsafe { (key.assume_init_ref(), value.assume_init_mut()) });
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Hash whose ideal bucket in a table of `capacity` buckets is `bucket`;
    /// `salt` picks among distinct hashes with that property.
    fn hash_at_bucket(bucket: usize, capacity: usize, salt: usize) -> u32 {
        let base = (OCCUPIED as usize) % capacity;
        ((bucket + capacity - base) % capacity + salt * capacity) as u32
    }

    fn insert_id(t: &mut RawTable<u32, u32>, hash: u32, id: u32) -> bool {
        t.insert(hash, id, id * 10, |a, b| a == b)
    }

    fn find_id(t: &RawTable<u32, u32>, hash: u32, id: u32) -> Option<usize> {
        t.find(hash, |k| *k == id)
    }

    /// Invariant: crafted hashes land on the requested ideal bucket.
    #[test]
    fn crafted_hashes_hit_their_bucket() {
        let t: RawTable<u32, u32> = RawTable::with_capacity(7);
        for b in 0..7 {
            for salt in 0..3 {
                assert_eq!(t.ideal_bucket(hash_at_bucket(b, 7, salt)), b);
            }
        }
    }

    /// Invariant: capacity is rounded up to a tabulated prime.
    #[test]
    fn capacity_rounds_to_prime() {
        assert_eq!(RawTable::<u8, ()>::with_capacity(0).capacity(), 7);
        assert_eq!(RawTable::<u8, ()>::with_capacity(20).capacity(), 31);
    }

    /// Invariant: duplicate inserts are rejected without mutation; find returns
    /// the bucket of the matching key.
    #[test]
    fn insert_find_and_duplicate() {
        let mut t = RawTable::with_capacity(7);
        assert!(insert_id(&mut t, 42, 1));
        assert!(!t.insert(42, 1, 99, |a, b| a == b));
        let idx = find_id(&t, 42, 1).expect("present");
        assert_eq!(t.entry_at(idx), (&1, &10));
        assert!(find_id(&t, 42, 2).is_none());
        assert!(find_id(&t, 43, 1).is_none());
        assert_eq!(t.occupied(), 1);
    }

    /// Invariant: same hash, different keys coexist and resolve by equality.
    #[test]
    fn equal_hashes_resolve_by_key() {
        let mut t = RawTable::with_capacity(7);
        for id in 0..4 {
            assert!(insert_id(&mut t, 5, id));
        }
        for id in 0..4 {
            let idx = find_id(&t, 5, id).unwrap();
            assert_eq!(*t.key_at(idx), id);
        }
    }

    /// Invariant: the shift test moves entries whose ideal bucket is outside
    /// `(freed, scan]`, including across the wrap point.
    #[test]
    fn shift_predicate_cases() {
        // No wrap: hole at 2, entry at 4.
        assert!(should_shift(2, 4, 2));
        assert!(should_shift(2, 4, 0));
        assert!(should_shift(2, 4, 5));
        assert!(!should_shift(2, 4, 3));
        assert!(!should_shift(2, 4, 4));
        // Wrapped: hole at 5, entry at 1.
        assert!(should_shift(5, 1, 5));
        assert!(should_shift(5, 1, 4));
        assert!(should_shift(5, 1, 2));
        assert!(!should_shift(5, 1, 6));
        assert!(!should_shift(5, 1, 0));
        assert!(!should_shift(5, 1, 1));
    }

    /// Invariant: removing the head of a cluster that wraps around the end of
    /// the table keeps every other member findable.
    #[test]
    fn remove_head_of_wrapping_cluster() {
        let mut t = RawTable::with_capacity(7);
        let ideals = [5usize, 5, 6, 6, 0];
        let hashes: Vec<u32> = ideals
            .iter()
            .enumerate()
            .map(|(i, &b)| hash_at_bucket(b, 7, i))
            .collect();
        for (id, &h) in hashes.iter().enumerate() {
            assert!(insert_id(&mut t, h, id as u32));
        }
        assert!(t.remove(hashes[0], |k| *k == 0).is_some());
        assert!(find_id(&t, hashes[0], 0).is_none());
        for (id, &h) in hashes.iter().enumerate().skip(1) {
            assert!(find_id(&t, h, id as u32).is_some(), "lost key {}", id);
        }
        // The cluster shrank by one: buckets 5,6,0,1 are occupied and 2 is free.
        assert!(!t.is_occupied(2));
        assert_eq!(t.occupied(), 4);
    }

    /// Invariant: an entry already sitting in its ideal bucket is never moved.
    #[test]
    fn entry_at_home_stays_put() {
        let mut t = RawTable::with_capacity(7);
        let a = hash_at_bucket(1, 7, 0);
        let b = hash_at_bucket(1, 7, 1);
        let c = hash_at_bucket(3, 7, 0);
        insert_id(&mut t, a, 0);
        insert_id(&mut t, b, 1);
        insert_id(&mut t, c, 2);
        // a@1, b@2, c@3 (home). Removing a pulls b back but leaves c.
        t.remove(a, |k| *k == 0).unwrap();
        assert_eq!(find_id(&t, b, 1), Some(1));
        assert_eq!(find_id(&t, c, 2), Some(3));
    }

    /// Invariant: removal of a missing key reports `None` and leaves the table intact.
    #[test]
    fn remove_missing_is_noop() {
        let mut t = RawTable::with_capacity(7);
        insert_id(&mut t, 3, 1);
        assert!(t.remove(3, |k| *k == 2).is_none());
        assert!(t.remove(4, |k| *k == 1).is_none());
        assert_eq!(t.occupied(), 1);
    }

    /// Invariant: grow moves to the next prime and keeps every entry.
    #[test]
    fn grow_preserves_entries() {
        let mut t = RawTable::with_capacity(7);
        for id in 0..4u32 {
            insert_id(&mut t, id.wrapping_mul(2_654_435_769), id);
        }
        t.grow();
        assert_eq!(t.capacity(), 17);
        for id in 0..4u32 {
            let idx = find_id(&t, id.wrapping_mul(2_654_435_769), id).unwrap();
            assert_eq!(*t.value_at(idx), id * 10);
        }
    }

    /// Invariant: past the largest tabulated prime, growth is by half the capacity.
    #[test]
    fn grow_past_table_uses_one_and_a_half() {
        let mut t: RawTable<u8, ()> = RawTable::with_capacity(MAX_PRIME);
        t.grow();
        assert_eq!(t.capacity(), MAX_PRIME + MAX_PRIME / 2);
    }

    /// Invariant: a rehash into a table too small for the entries panics
    /// before moving anything, so every entry stays findable.
    #[test]
    fn rehash_into_too_small_table_keeps_entries() {
        let mut t = RawTable::with_capacity(17);
        for id in 0..10u32 {
            assert!(insert_id(&mut t, id, id));
        }
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| t.rehash(7)));
        assert!(res.is_err());
        assert_eq!(t.capacity(), 17);
        assert_eq!(t.occupied(), 10);
        for id in 0..10u32 {
            let idx = find_id(&t, id, id).expect("entry kept");
            assert_eq!(*t.value_at(idx), id * 10);
        }
        // Exactly full is still a valid target.
        let mut full = RawTable::with_capacity(17);
        for id in 0..7u32 {
            insert_id(&mut full, id, id);
        }
        full.rehash(7);
        assert_eq!(full.occupied(), 7);
        assert!(find_id(&full, 6, 6).is_some());
    }

    /// Invariant: `needs_rehash` trips at exactly 70% occupancy.
    #[test]
    fn needs_rehash_threshold() {
        let t: RawTable<u8, ()> = RawTable::with_capacity(17);
        // 17 * 70 = 1190; 11 * 100 = 1100 < 1190; 12 * 100 = 1200 >= 1190.
        assert!(!t.needs_rehash(11));
        assert!(t.needs_rehash(12));
    }

    /// Invariant: clear and drop release exactly the stored entries.
    #[test]
    fn clear_and_drop_release_entries() {
        let tracker = Rc::new(());
        let mut t = RawTable::with_capacity(7);
        for id in 0..3u32 {
            assert!(t.insert(id, id, Rc::clone(&tracker), |a, b| a == b));
        }
        assert_eq!(Rc::strong_count(&tracker), 4);
        t.clear();
        assert_eq!(Rc::strong_count(&tracker), 1);
        assert_eq!(t.occupied(), 0);
        assert_eq!(t.capacity(), 7);

        for id in 0..3u32 {
            t.insert(id, id, Rc::clone(&tracker), |a, b| a == b);
        }
        let (_k, v) = t.remove(1, |k| *k == 1).unwrap();
        assert_eq!(Rc::strong_count(&tracker), 4);
        drop(v);
        drop(t);
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    /// Invariant: iteration yields occupied buckets in bucket order and
    /// `iter_mut` edits are visible to later lookups.
    #[test]
    fn iteration_in_bucket_order() {
        let mut t = RawTable::with_capacity(7);
        insert_id(&mut t, hash_at_bucket(4, 7, 0), 4);
        insert_id(&mut t, hash_at_bucket(1, 7, 0), 1);
        insert_id(&mut t, hash_at_bucket(6, 7, 0), 6);
        let keys: Vec<u32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 4, 6]);

        for (_k, v) in t.iter_mut() {
            *v += 1;
        }
        let idx = find_id(&t, hash_at_bucket(4, 7, 0), 4).unwrap();
        assert_eq!(*t.value_at(idx), 41);
    }

    #[test]
    #[should_panic(expected = "insert into a full hash table")]
    fn insert_into_full_table_panics() {
        let mut t: RawTable<u32, ()> = RawTable::with_capacity(7);
        for id in 0..8u32 {
            t.insert(id, id, (), |a, b| a == b);
        }
    }
}
