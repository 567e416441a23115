use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Source of every random draw made by the simulation.
///
/// Only `uniform` is required; the other draws are derived from it so a
/// scripted source can pin down outcomes in tests.
pub trait RandomSource: Send {
    /// Uniform draw in [0, 1)
    fn uniform(&mut self) -> f64;

    /// Uniform draw in [low, high)
    fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform()
    }

    /// Uniform index in 0..len; `len` must be non-zero
    fn index(&mut self, len: usize) -> usize {
        ((self.uniform() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Exponentially distributed draw with the given rate (inverse transform)
    fn exponential(&mut self, rate: f64) -> f64 {
        -(1.0 - self.uniform()).ln() / rate
    }
}

/// Seeded `StdRng` source used for real runs
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    fn exponential(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => f64::INFINITY,
        }
    }
}

/// Replays a fixed list of uniform draws in a loop
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Always returns the same draw
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Weighted choice over a list of (weight, outcome) pairs using a
/// cumulative-probability scan. Non-positive weights are never chosen.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    entries: Vec<(f64, T)>,
    total: f64,
}

impl<T> WeightedSampler<T> {
    pub fn new(entries: Vec<(f64, T)>) -> Self {
        let total = entries
            .iter()
            .map(|(weight, _)| weight.max(0.0))
            .filter(|weight| weight.is_finite())
            .sum();
        Self { entries, total }
    }

    pub fn total_weight(&self) -> f64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total <= 0.0
    }

    pub fn sample(&self, rng: &mut dyn RandomSource) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let target = rng.uniform() * self.total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (weight, outcome) in &self.entries {
            if !weight.is_finite() || *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(outcome);
            if target < cumulative {
                return Some(outcome);
            }
        }
        // Rounding can leave target a hair above the final cumulative sum
        last_positive
    }
}
