//! Prime capacities for the hash tables.
//!
//! Table sizes are drawn from [`PRIMES`] so that `hash % capacity` spreads
//! FNV hashes well. [`mod_prime`] matches on the tabulated values so each arm
//! divides by a constant.

pub const MIN_PRIME: usize = 7;
pub const MAX_PRIME: usize = 1_048_583;

/// Ascending table capacities.
pub const PRIMES: [usize; 15] = [
    MIN_PRIME, 17, 31, 67, 257, 1031, 4093, 8191, 16381, 32381, 65539, 131071, 262147, 524287,
    MAX_PRIME,
];

/// Smallest tabulated prime `>= n`, or `n` itself past [`MAX_PRIME`].
#[must_use]
pub fn next_prime(n: usize) -> usize {
    PRIMES.iter().copied().find(|&p| n <= p).unwrap_or(n)
}

/// `i % p`, with constant-divisor fast paths for the tabulated primes.
///
/// # Panics
/// Panics if `p == 0`.
#[inline]
#[must_use]
pub fn mod_prime(i: usize, p: usize) -> usize {
    assert!(p != 0, "modulo by zero capacity");
    match p {
        7 => i % 7,
        17 => i % 17,
        31 => i % 31,
        67 => i % 67,
        257 => i % 257,
        1031 => i % 1031,
        4093 => i % 4093,
        8191 => i % 8191,
        16381 => i % 16381,
        32381 => i % 32381,
        65539 => i % 65539,
        131071 => i % 131071,
        262147 => i % 262147,
        524287 => i % 524287,
        1_048_583 => i % 1_048_583,
        _ => i % p,
    }
}
