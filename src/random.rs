use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::UsageScorer;
use crate::recognition::{Detector, IdentitySource};

pub fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub struct RandomScorer {
    rng: StdRng,
}

impl RandomScorer {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl UsageScorer for RandomScorer {
    fn score(&mut self) -> u8 {
        self.rng.gen_range(0..=100)
    }
}

pub struct RandomIdentities {
    rng: StdRng,
    id_pool: u32,
    name_pool: u32,
}

impl RandomIdentities {
    pub fn new(rng: StdRng, id_pool: u32, name_pool: u32) -> Self {
        Self {
            rng,
            id_pool: id_pool.max(1),
            name_pool: name_pool.max(1),
        }
    }
}

impl IdentitySource for RandomIdentities {
    fn student_id(&mut self) -> u32 {
        self.rng.gen_range(0..self.id_pool)
    }

    fn name_suffix(&mut self) -> u32 {
        self.rng.gen_range(0..self.name_pool)
    }

    fn hostel_index(&mut self, count: usize) -> usize {
        self.rng.gen_range(0..count.max(1))
    }
}

/// Stand-in for the camera: reports a face with probability `rate`.
pub struct SimulatedDetector {
    rng: StdRng,
    rate: f64,
}

impl SimulatedDetector {
    pub fn new(rng: StdRng, rate: f64) -> Self {
        Self {
            rng,
            rate: if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) },
        }
    }
}

impl Detector for SimulatedDetector {
    fn faces_present(&mut self) -> anyhow::Result<bool> {
        Ok(self.rng.gen_bool(self.rate))
    }
}
