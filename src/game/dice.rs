//! Random draws behind a trait so every roll can be replayed in tests.
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness used by every resolver.
pub trait Dice {
    /// Uniform draw in `[0, 1)`.
    fn roll(&mut self) -> f64;

    /// Uniform integer in `lo..=hi`. Returns `lo` when the range is empty.
    fn between(&mut self, lo: i64, hi: i64) -> i64;

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.roll() < p
    }
}

/// Production dice backed by `StdRng`.
pub struct DiceBag {
    rng: StdRng,
}

impl DiceBag {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Dice for DiceBag {
    fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn between(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            lo
        } else {
            self.rng.gen_range(lo..=hi)
        }
    }
}

/// Dice that replay queued values.
///
/// `roll` pops queued rolls and then keeps returning the fallback (0.99 unless
/// changed, i.e. "nothing lucky happens"). `between` pops queued picks clamped into
/// the requested range, then returns the low end.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: VecDeque<f64>,
    picks: VecDeque<i64>,
    fallback: f64,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            picks: VecDeque::new(),
            fallback: 0.99,
        }
    }

    pub fn with_picks(mut self, picks: impl IntoIterator<Item = i64>) -> Self {
        self.picks = picks.into_iter().collect();
        self
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Queued rolls not yet consumed.
    pub fn rolls_left(&self) -> usize {
        self.rolls.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }

    fn between(&mut self, lo: i64, hi: i64) -> i64 {
        match self.picks.pop_front() {
            Some(pick) if lo <= hi => pick.clamp(lo, hi),
            _ => lo,
        }
    }
}

/// Pick one entry from a `(weight, value)` table.
///
/// Weights are normalised against their total, so they need not sum to one. Negative
/// weights count as zero; an all-zero table yields `None`.
pub fn weighted_pick<'a, T>(dice: &mut dyn Dice, table: &'a [(f64, T)]) -> Option<&'a T> {
    let total: f64 = table.iter().map(|(weight, _)| weight.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let target = dice.roll() * total;
    let mut upto = 0.0;
    for (weight, value) in table {
        upto += weight.max(0.0);
        if target < upto {
            return Some(value);
        }
    }
    table
        .iter()
        .rev()
        .find(|(weight, _)| *weight > 0.0)
        .map(|(_, value)| value)
}
