//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(symbol, iteration)`
//! pair. Sub-seeds are derived via BLAKE3 hashing, independently of thread
//! scheduling order, so results are identical regardless of thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (symbol, iteration).
    ///
    /// Independent of derivation order: deriving "BTCUSDT" then "ETHUSDT"
    /// gives the same seeds as the reverse.
    pub fn sub_seed(&self, symbol: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }

    pub fn rng_for(&self, symbol: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, iteration))
    }
}
