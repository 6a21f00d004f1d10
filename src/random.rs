//! Explicit, seedable randomness for a run.
//!
//! Every random decision in a pipeline is drawn from a [`RandomContext`]
//! owned by the pipeline. Parallel work never shares a generator: each
//! task gets its own stream derived from the run seed, the iteration and
//! the task index, so results do not depend on the thread count.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Creates a seeded standard RNG.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Per-run random number source.
#[derive(Debug, Clone)]
pub struct RandomContext {
    seed: u64,
    rng: StdRng,
}

impl RandomContext {
    /// Creates a context from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: create_rng(seed),
        }
    }

    /// Creates a context from `seed`, or from entropy when `None`.
    pub fn from_seed(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or_else(rand::random))
    }

    /// The seed this context was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The sequential generator used by operators on the pipeline thread.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// An independent generator for one task of a parallel region.
    ///
    /// The stream depends only on `(seed, iteration, task)`.
    pub fn task_rng(&self, iteration: u64, task: u64) -> StdRng {
        let mut key = <StdRng as SeedableRng>::Seed::default();
        key[..8].copy_from_slice(&self.seed.to_le_bytes());
        key[8..16].copy_from_slice(&iteration.to_le_bytes());
        key[16..24].copy_from_slice(&task.to_le_bytes());
        StdRng::from_seed(key)
    }

    /// A uniformly random permutation of `0..n`.
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(&mut self.rng);
        idx
    }
}
