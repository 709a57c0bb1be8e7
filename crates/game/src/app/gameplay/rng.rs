use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random rolls for wandering NPCs and battle damage. Tests seed it.
#[derive(Debug, Clone)]
pub(crate) struct Dice {
    rng: StdRng,
}

impl Dice {
    pub(crate) fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub(crate) fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Inclusive on both ends. `max <= min` always yields `min`.
    pub(crate) fn between(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    pub(crate) fn choose<'a, T>(&mut self, values: &'a [T]) -> Option<&'a T> {
        if values.is_empty() {
            return None;
        }
        values.get(self.rng.gen_range(0..values.len()))
    }
}
