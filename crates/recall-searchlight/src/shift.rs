//! Deterministic circular-shift generation for permutation runs.
//!
//! The shift for a permutation depends only on the permutation index and the
//! trajectory length, never on the subject. Every subject processed under the
//! same index therefore receives the same shift, which keeps the null
//! distribution coherent across subjects at group level.
//!
//! The generator is [`ChaCha8Rng`], whose output stream is stable across
//! platforms and crate releases.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest permutation index accepted as a seed.
///
/// Matches the 32-bit seed domain used by the rest of the permutation
/// pipeline; larger indices select observed mode.
pub const MAX_PERMUTATION_INDEX: i64 = u32::MAX as i64;

/// Smallest trajectory length that admits a non-trivial shift.
///
/// Shifts are drawn from `[1, T-2]`, which is empty below three timepoints.
pub const MIN_SHIFTABLE_TIMEPOINTS: usize = 3;

/// Interpret a raw permutation argument.
///
/// Negative values are the observed-mode sentinel; values above
/// [`MAX_PERMUTATION_INDEX`] are outside the seed domain. Both yield `None`.
pub fn permutation_seed(perm: i64) -> Option<u32> {
    if (0..=MAX_PERMUTATION_INDEX).contains(&perm) {
        Some(perm as u32)
    } else {
        None
    }
}

/// Draw the circular shift for permutation `index` over `n_timepoints`.
///
/// Returns a value in `[1, n_timepoints - 2]`, or `None` when that range is
/// empty (`n_timepoints < 3`).
///
/// # Example
///
/// ```rust
/// use recall_searchlight::shift::permutation_shift;
///
/// let a = permutation_shift(3, 20);
/// let b = permutation_shift(3, 20);
/// assert_eq!(a, b);
/// assert_eq!(a, Some(12));
/// ```
pub fn permutation_shift(index: u32, n_timepoints: usize) -> Option<usize> {
    if n_timepoints < MIN_SHIFTABLE_TIMEPOINTS {
        return None;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(index));
    let upper = (n_timepoints - 2) as u64;
    Some(rng.gen_range(1..=upper) as usize)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_index_is_observed_sentinel() {
        assert_eq!(permutation_seed(-1), None);
        assert_eq!(permutation_seed(i64::MIN), None);
    }

    #[test]
    fn index_beyond_seed_domain_is_rejected() {
        assert_eq!(permutation_seed(MAX_PERMUTATION_INDEX), Some(u32::MAX));
        assert_eq!(permutation_seed(MAX_PERMUTATION_INDEX + 1), None);
    }

    #[test]
    fn zero_is_a_valid_index() {
        assert_eq!(permutation_seed(0), Some(0));
    }

    #[test]
    fn short_trajectories_cannot_be_shifted() {
        assert_eq!(permutation_shift(7, 0), None);
        assert_eq!(permutation_shift(7, 2), None);
        // T = 3 leaves exactly one admissible shift.
        assert_eq!(permutation_shift(7, 3), Some(1));
    }

    #[test]
    fn pinned_regression_values() {
        assert_eq!(permutation_shift(3, 20), Some(12));
        assert_eq!(permutation_shift(0, 20), Some(9));
        assert_eq!(permutation_shift(1, 20), Some(8));
    }

    proptest! {
        #[test]
        fn shift_lies_in_admissible_range(index in any::<u32>(), t in 3usize..5000) {
            let shift = permutation_shift(index, t).unwrap();
            prop_assert!(shift >= 1 && shift <= t - 2, "shift {} for T={}", shift, t);
        }

        #[test]
        fn shift_is_reproducible(index in any::<u32>(), t in 3usize..5000) {
            prop_assert_eq!(permutation_shift(index, t), permutation_shift(index, t));
        }
    }
}
