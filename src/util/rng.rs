// Copyright (c) 2024 Mike Tsao

//! Provides the random-number generator behind the arpeggiator's density and
//! randomize gates and its pan scatter.

use byteorder::{BigEndian, ByteOrder};
use delegate::delegate;

/// A pseudorandom number generator (PRNG) for audio work that doesn't need
/// cryptographically secure numbers. It never allocates or blocks after
/// construction, so it's safe to call from the render path.
#[derive(Debug, Clone)]
pub struct Rng(oorandom::Rand64);
impl Default for Rng {
    fn default() -> Self {
        let seed = Self::generate_seed().unwrap_or_else(|e| {
            log::warn!("Couldn't get an OS random seed ({e}); falling back to a fixed one");
            Self::FALLBACK_SEED
        });
        Self::new_with_seed(seed)
    }
}
#[allow(missing_docs)]
impl Rng {
    const FALLBACK_SEED: u128 = 0x5eed_ab1e_0123_4567_89ab_cdef_0000_0001;

    /// Pass the same number to [Rng::new_with_seed()] to get the same stream
    /// back again. Good for reproducing test failures.
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    /// A seeded [Rng] if a seed is given, otherwise an OS-seeded one.
    pub fn new_with_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::default, |seed| Self::new_with_seed(seed as u128))
    }

    /// Create a sufficiently high-quality random number that's suitable for
    /// [Rng].
    pub fn generate_seed() -> anyhow::Result<u128> {
        let mut bytes = [0u8; 16];

        getrandom::getrandom(&mut bytes)?;
        Ok(BigEndian::read_u128(&bytes))
    }

    /// A uniformly distributed index in `0..len`. `len` must be nonzero.
    pub fn rand_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.0.rand_range(0..len.max(1) as u64) as usize
    }

    /// A uniformly distributed value in `[-1.0, 1.0)`.
    pub fn rand_bipolar(&mut self) -> f64 {
        self.0.rand_float() * 2.0 - 1.0
    }

    delegate! {
        to self.0 {
            pub fn rand_u64(&mut self) -> u64;
            pub fn rand_float(&mut self) -> f64;
        }
    }
}
