//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! All randomness flows through StageRng instances derived
//! from the single master seed in the run configuration.
//!
//! Each random stage gets its own stream, seeded deterministically
//! from (master_seed XOR stage_index). This means:
//!   - Adding a new stage never changes existing stages' streams.
//!   - Each stage's stream is fully reproducible in isolation.
//!   - Within a stage, draws happen in a fixed documented order.

use rand::SeedableRng;
use rand_distr::{Beta, Distribution, LogNormal, Normal};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single pipeline stage.
pub struct StageRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StageRng {
    /// Create a stage RNG from the master seed and a stable
    /// stage index. The index must never change once assigned.
    pub fn new(master_seed: u64, stage_index: u64) -> Self {
        let derived_seed = master_seed ^ (stage_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [low, high).
    pub fn range_i64(&mut self, low: i64, high: i64) -> i64 {
        assert!(high > low, "empty range {low}..{high}");
        low + self.next_u64_below((high - low) as u64) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Weighted categorical draw. Weights are expected to sum to 1;
    /// any rounding shortfall falls through to the last entry.
    pub fn pick<T: Copy>(&mut self, table: &[(T, f64)]) -> T {
        assert!(!table.is_empty(), "pick() on empty weight table");
        let roll = self.next_f64();
        let mut cumulative = 0.0;
        for &(value, weight) in table {
            cumulative += weight;
            if roll < cumulative {
                return value;
            }
        }
        table[table.len() - 1].0
    }

    /// Gaussian draw. A degenerate standard deviation yields the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Log-normal draw parameterised by the underlying normal's mu and sigma.
    pub fn log_normal(&mut self, mu: f64, sigma: f64) -> f64 {
        match LogNormal::new(mu, sigma) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mu.exp(),
        }
    }

    /// Beta draw on [0, 1]. Invalid shape parameters yield the midpoint.
    pub fn beta(&mut self, alpha: f64, beta: f64) -> f64 {
        match Beta::new(alpha, beta) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => 0.5,
        }
    }
}

/// All stage RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stage(&self, slot: StageSlot) -> StageRng {
        StageRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stage slot assignments.
/// NEVER reorder or remove entries; only append.
/// Reordering changes every stage's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StageSlot {
    Population = 0,
    Campaign = 1,
    Eligibility = 2,
    Exposure = 3,
    Transaction = 4,
    // Add new random stages here, append only.
}

impl StageSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Campaign => "campaign",
            Self::Eligibility => "eligibility",
            Self::Exposure => "exposure",
            Self::Transaction => "transaction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slot_same_seed_replays_identically() {
        let bank = RngBank::new(42);
        let mut a = bank.for_stage(StageSlot::Transaction);
        let mut b = bank.for_stage(StageSlot::Transaction);
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
        assert_eq!(a.normal(0.0, 1.0).to_bits(), b.normal(0.0, 1.0).to_bits());
    }

    #[test]
    fn stages_get_independent_streams() {
        let bank = RngBank::new(42);
        let mut pop = bank.for_stage(StageSlot::Population);
        let mut camp = bank.for_stage(StageSlot::Campaign);
        let a: Vec<u64> = (0..8).map(|_| pop.next_u64_below(1_000_000)).collect();
        let b: Vec<u64> = (0..8).map(|_| camp.next_u64_below(1_000_000)).collect();
        assert_ne!(a, b);
        assert_eq!(pop.name, "population");
    }

    #[test]
    fn range_and_beta_stay_in_bounds() {
        let mut rng = RngBank::new(7).for_stage(StageSlot::Exposure);
        for _ in 0..1_000 {
            let v = rng.range_i64(30, 900);
            assert!((30..900).contains(&v));
            let b = rng.beta(2.2, 3.5);
            assert!((0.0..=1.0).contains(&b));
        }
    }

    #[test]
    fn pick_respects_weights_roughly() {
        let mut rng = RngBank::new(11).for_stage(StageSlot::Campaign);
        let table = [("a", 0.9), ("b", 0.1)];
        let hits = (0..10_000).filter(|_| rng.pick(&table) == "a").count();
        assert!((8_700..9_300).contains(&hits), "got {hits}");
    }
}
