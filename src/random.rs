//! Seeded randomness shared by the solvers and fold assignment
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when no other seed is given.
pub const DEFAULT_SEED: u64 = 20000;

/// Returns a generator seeded with `seed`.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Shuffles the first `len` entries of `index` in place (Fisher-Yates).
///
/// Position `i` is swapped with a uniformly drawn position in `i..len`.
pub fn shuffle_prefix(index: &mut [usize], len: usize, rng: &mut StdRng) {
    for i in 0..len {
        let j = i + rng.gen_range(0..len - i);
        index.swap(i, j);
    }
}
