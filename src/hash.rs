use std::hash::{BuildHasher, Hash};

use rand::Rng;

/// Default keyed base hash for every backend.
pub type DefaultHashBuilder = ahash::RandomState;

/// Golden-ratio constant; XOR-mixed into the second salt so the two
/// hash functions can never coincide.
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// The per-instance salt pair that turns one base hash into the two
/// cuckoo hash functions: `h_i(k) = (H(k) ^ salt_i) mod capacity`.
///
/// A fresh pair is drawn on every resize; indices computed under old
/// salts are never reused.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Salts([u64; 2]);

impl Salts {
    pub(crate) fn generate(rng: &mut impl Rng) -> Self {
        let salt = rng.gen::<u64>();
        Salts([salt, salt ^ GOLDEN_GAMMA])
    }

    /// Slot index of `hash` in the given table under the current salts.
    #[inline]
    pub(crate) fn index(&self, table: usize, hash: u64, capacity: usize) -> usize {
        ((hash ^ self.0[table]) % capacity as u64) as usize
    }
}

#[inline]
pub(crate) fn hash_one<S: BuildHasher, T: Hash>(builder: &S, key: &T) -> u64 {
    builder.hash_one(key)
}
