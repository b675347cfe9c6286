//! Object spawning
//!
//! The spawner owns the session's seeded RNG and id counter, so two
//! spawners created with the same seed produce identical objects.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::level::LevelConfig;
use super::operation::Operation;
use super::state::{FallingObject, Lane};

/// Seeded object factory, one per session
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    next_id: u32,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Allocate a new object ID
    fn next_object_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create an object at the spawn edge with a random lane and operation
    pub fn spawn_object(&mut self, config: &LevelConfig) -> FallingObject {
        let lane = if self.rng.random_bool(0.5) {
            Lane::Left
        } else {
            Lane::Right
        };

        let pool = config.operations.expand();
        let operation = if pool.is_empty() {
            log::warn!("Level {} has no operations, spawning +1", config.level);
            Operation::add(1)
        } else {
            pool[self.rng.random_range(0..pool.len())].clone()
        };

        FallingObject {
            id: self.next_object_id(),
            lane,
            operation,
            position: 0.0,
            speed: config.object_speed,
            consumed: false,
        }
    }
}
