// src/randomizer/rng.rs

/// Replaces an all-zero xorshift state, which would otherwise stay zero forever.
const FALLBACK_STATE: u64 = 0x2545_f491_4f6c_dd1d;

/// Deterministic xorshift64 generator.
///
/// Not cryptographically secure. The same seed yields the same sequence on
/// every platform.
#[derive(Debug, Clone)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    /// Expands a 32-bit seed with one splitmix64 step so that neighbouring
    /// seeds start from unrelated states.
    pub fn from_seed(seed: u32) -> Self {
        let mut z = u64::from(seed).wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;

        Self {
            state: if z == 0 { FALLBACK_STATE } else { z },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Value in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn next_below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "bound must be non-zero");
        (self.next_u64() % bound as u64) as usize
    }

    /// Fisher-Yates, walking from the last index down to the first.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }
}
