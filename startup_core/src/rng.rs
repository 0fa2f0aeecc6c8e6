use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use startup_schema::RngStateRecord;

/// Source of uniform draws in `[0, 1)`.
///
/// The session consumes draws in a fixed order (event triggers, then one per
/// risky action, then economy variance when enabled), so replaying the same
/// choices against the same stream reproduces every outcome.
pub trait RollSource {
    fn roll(&mut self) -> f64;
}

/// The session's random stream. Its continuation point can be persisted and
/// restored exactly.
#[derive(Debug, Clone)]
pub struct SessionRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl SessionRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn restore(record: RngStateRecord) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(record.seed);
        inner.set_word_pos(record.word_pos);
        Self {
            seed: record.seed,
            inner,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn to_record(&self) -> RngStateRecord {
        RngStateRecord {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }
}

impl RollSource for SessionRng {
    fn roll(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Predetermined draws, handed out in order. Once exhausted every roll
/// returns `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<f64>,
    fallback: f64,
    consumed: usize,
}

impl ScriptedRolls {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            fallback: 0.0,
            consumed: 0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self) -> f64 {
        self.consumed += 1;
        self.rolls.pop_front().unwrap_or(self.fallback)
    }
}
