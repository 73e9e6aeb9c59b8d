use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};

use crate::{
    MAX_CLOCK_RATE, MIN_CLOCK_RATE, Port,
    action::{ACTION_SPACE, Action, ActionSource},
};

pub type Seed = u64;

/// Per-machine source of randomness: the clock rate draw and every action.
pub struct Randomizer {
    rnd: rand::rngs::StdRng,
}

impl Randomizer {
    pub fn new(seed: Seed) -> Self {
        Self {
            rnd: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    /// Machines started together share a base seed, so shift it by the port
    /// to keep their sequences apart.
    pub fn for_machine(base_seed: Seed, port: Port) -> Self {
        Self::new(base_seed.wrapping_add(Seed::from(port)))
    }

    pub fn clock_rate(&mut self) -> usize {
        self.rnd.random_range(MIN_CLOCK_RATE..=MAX_CLOCK_RATE)
    }

    pub fn outcome(&mut self) -> u32 {
        self.rnd.random_range(1..=ACTION_SPACE)
    }
}

impl ActionSource for Randomizer {
    fn next_action(&mut self) -> Action {
        Action::from_outcome(self.outcome())
    }
}

pub(crate) fn wall_clock_seed() -> Seed {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as Seed)
        .unwrap_or_default()
}
