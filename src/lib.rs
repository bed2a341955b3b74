//! hashpool: open-addressing hash maps and sets, and hash-consing pools
//! built on them.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small stack of containers where each layer has one job and a
//!   precise contract, so the subtle parts (deletion, canonicalization) can be
//!   tested in isolation.
//! - Layers:
//!   - RawTable<K, V>: open-addressing engine. Linear probing over prime
//!     capacities, a parallel `u32` hash array whose top bit marks occupied
//!     buckets, and backward-shift deletion (no tombstones). Callers supply
//!     the hash and the key equality on every call.
//!   - Map<K, V, S> / Set<T, S>: typed facade. Hashes keys with `S`, counts
//!     elements, and grows the table right after the insert that reaches a
//!     70% load factor.
//!   - ImmutableSetPool<T, S>: hash-consing. Canonicalizes element sequences
//!     (sorted, deduplicated) and returns one `SetHandle` per distinct
//!     content. Built on a `Set` of arena keys compared by content.
//!   - StrPool: string interning on the same hash-explicit `Set` API.
//!
//! Constraints
//! - Single-threaded discipline: no locks, no atomics. Mutation takes
//!   `&mut self`; references into a container are borrows that end before
//!   the next structural change.
//! - Allocation failure aborts; there is no partial-failure path.
//! - Found/not-found and inserted/already-present are plain `Option`/`bool`
//!   results. Broken internal invariants panic.
//!
//! Hashing
//! - 32-bit FNV-1a (`hash` module). Integers decompose most significant byte
//!   first; floats hash their bit pattern. `FnvBuildHasher` is the default
//!   `S` for every container.
//! - The engine stores each key's hash and never rehashes keys with user
//!   code; growth reuses the stored hashes.
//!
//! Deletion invariant
//! - After any removal, every remaining key is still reachable by its own
//!   probe sequence starting at `hash mod capacity`. `RawTable::remove`
//!   maintains it by moving later cluster members back into the hole unless
//!   their ideal bucket lies in the cyclic interval `(hole, position]`.
//!
//! Growth
//! - Capacities follow the prime table 7, 17, 31, ..., 1048583. Past the
//!   largest prime a table grows by half its capacity.
//!
//! Reentrancy
//! - Map/Set entry points run a debug-only busy flag while they probe, so a
//!   user `Eq`/`Hash` that reaches back into the same container panics in
//!   debug builds instead of observing a half-finished operation. The flag
//!   costs nothing in release.
//!
//! Pool lifetime
//! - Pooled sets live in a generational arena. They are never freed one by
//!   one; `reset` frees them all and old handles stop resolving rather than
//!   dangling.

mod guard;
pub mod hash;
pub mod immutable_set;
pub mod map;
#[cfg(test)]
mod map_proptest;
pub mod primes;
pub mod set;
pub mod str_pool;
pub mod table;

// Public surface
pub use hash::{FnvBuildHasher, FnvHasher};
pub use immutable_set::{ImmutableSet, ImmutableSetPool, SetHandle};
pub use map::Map;
pub use set::Set;
pub use str_pool::{StrPool, Symbol};
pub use table::RawTable;
