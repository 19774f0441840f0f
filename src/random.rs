// Uniform integer randomness used by blinks, gaze and iris motion.

use rand::Rng;

/// Uniform integer generator. `random(n)` draws from `[0, n)` and
/// `random_range(lo, hi)` from `[lo, hi)`; empty ranges return the lower bound.
pub trait RandomSource {
    fn random(&mut self, n: u32) -> u32;
    fn random_range(&mut self, lo: u32, hi: u32) -> u32;
}

impl<R: Rng> RandomSource for R {
    fn random(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.gen_range(0..n)
    }

    fn random_range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.gen_range(lo..hi)
    }
}
