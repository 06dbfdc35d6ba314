//! Random sources for RANDOMSORT events

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Produces `n` priority values per call
pub trait RandomSource {
    fn draw(&mut self, n: usize) -> Vec<f64>;
}

/// Uniform [0, 1) draws from a seeded ChaCha8 stream
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn draw(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.rng.gen::<f64>()).collect()
    }
}

/// Replays a fixed sequence, cycling when it runs out
#[derive(Debug, Clone)]
pub struct FixedDraws {
    values: Vec<f64>,
    cursor: usize,
}

impl FixedDraws {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Every draw returns the same value
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for FixedDraws {
    fn draw(&mut self, n: usize) -> Vec<f64> {
        if self.values.is_empty() {
            return vec![0.0; n];
        }
        (0..n)
            .map(|_| {
                let v = self.values[self.cursor % self.values.len()];
                self.cursor += 1;
                v
            })
            .collect()
    }
}
