//! Single seeded randomness source for a run.
//!
//! Every nondeterministic decision in the engine — codelet selection,
//! weighted retrieval, tournament coin flips, recycling dice — draws from
//! this one machine, so an entire run replays exactly given its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug)]
pub struct RandomMachine {
    seed: u64,
    rng: StdRng,
}

impl RandomMachine {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from entropy but keep the seed recorded so the run can still
    /// be replayed afterwards.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in [0, 1).
    pub fn generate_number(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    pub fn coin_flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    pub fn uniform_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng.gen_range(0..len))
    }

    /// Roulette-wheel selection: index i wins with probability proportional
    /// to `weights[i]`. NaN and negative weights count as zero. When the
    /// weight mass is zero the choice degrades to uniform — an empty slice
    /// is the only way to get `None`.
    pub fn select_index_weighted(&mut self, weights: &[f32]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let clean: Vec<f32> = weights
            .iter()
            .map(|w| if w.is_nan() || *w < 0.0 { 0.0 } else { *w })
            .collect();
        let total: f32 = clean.iter().sum();
        if total <= 0.0 {
            return self.uniform_index(clean.len());
        }
        // The pointer draw can be exactly 0.0 and round-off can leave it
        // fractionally positive after the descent; both boundaries must
        // still land on a positive-weight element.
        let mut pointer = self.rng.gen::<f32>() * total;
        let mut last_positive = None;
        for (i, w) in clean.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            last_positive = Some(i);
            pointer -= w;
            if pointer <= 0.0 {
                return Some(i);
            }
        }
        last_positive
    }
}
