//! 32-bit FNV-1a hashing.
//!
//! Every function folds one value into an accumulator and returns the new
//! accumulator, so hashes of compound values are built by chaining calls
//! starting from [`FNV_SEED`]. Multi-byte integers are decomposed most
//! significant byte first; floats hash their IEEE bit pattern.
//!
//! [`FnvHasher`] exposes the same function through `core::hash::Hasher`, so
//! any `K: Hash` can be used as a map key with [`FnvBuildHasher`].

use core::hash::{BuildHasher, Hasher};

/// Initial accumulator value.
pub const FNV_SEED: u32 = 0x811c_9dc5;
/// Per-byte multiplier.
pub const FNV_PRIME: u32 = 0x0100_0193;

#[inline]
#[must_use]
pub fn hash_u8(h: u32, x: u8) -> u32 {
    (h ^ x as u32).wrapping_mul(FNV_PRIME)
}

#[inline]
#[must_use]
pub fn hash_u16(h: u32, x: u16) -> u32 {
    hash_u8(hash_u8(h, (x >> 8) as u8), x as u8)
}

#[inline]
#[must_use]
pub fn hash_u32(h: u32, x: u32) -> u32 {
    hash_u16(hash_u16(h, (x >> 16) as u16), x as u16)
}

#[inline]
#[must_use]
pub fn hash_u64(h: u32, x: u64) -> u32 {
    hash_u32(hash_u32(h, (x >> 32) as u32), x as u32)
}

#[inline]
#[must_use]
pub fn hash_f32(h: u32, x: f32) -> u32 {
    hash_u32(h, x.to_bits())
}

#[inline]
#[must_use]
pub fn hash_f64(h: u32, x: f64) -> u32 {
    hash_u64(h, x.to_bits())
}

#[inline]
#[must_use]
pub fn hash_bytes(h: u32, bytes: &[u8]) -> u32 {
    bytes.iter().fold(h, |h, &b| hash_u8(h, b))
}

/// Hashes the UTF-8 bytes of `s` without any terminator or length prefix.
#[inline]
#[must_use]
pub fn hash_str(h: u32, s: &str) -> u32 {
    hash_bytes(h, s.as_bytes())
}

/// `Hasher` adapter over the FNV-1a step functions above.
#[derive(Clone, Copy, Debug)]
pub struct FnvHasher {
    state: u32,
}

impl FnvHasher {
    pub const fn new() -> Self {
        Self { state: FNV_SEED }
    }

    /// Current accumulator, truncated to the 32 bits the tables store.
    #[inline]
    pub fn finish_u32(&self) -> u32 {
        self.state
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state as u64
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.state = hash_bytes(self.state, bytes);
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.state = hash_u8(self.state, i);
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.state = hash_u16(self.state, i);
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.state = hash_u32(self.state, i);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.state = hash_u64(self.state, i);
    }

    #[inline]
    fn write_u128(&mut self, i: u128) {
        self.state = hash_u64(hash_u64(self.state, (i >> 64) as u64), i as u64);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.state = hash_u64(self.state, i as u64);
    }
}

/// Stateless builder for [`FnvHasher`]; the default hasher of every container
/// in this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FnvBuildHasher;

impl BuildHasher for FnvBuildHasher {
    type Hasher = FnvHasher;

    #[inline]
    fn build_hasher(&self) -> FnvHasher {
        FnvHasher::new()
    }
}

/// Hashes `value` with `hasher` and truncates to the 32-bit table hash.
#[inline]
pub(crate) fn make_hash<S, Q>(hasher: &S, value: &Q) -> u32
where
    S: BuildHasher,
    Q: ?Sized + core::hash::Hash,
{
    hasher.hash_one(value) as u32
}
