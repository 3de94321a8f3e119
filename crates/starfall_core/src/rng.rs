//! Injectable random source.
//!
//! Every roll in the simulation goes through [`RandomSource`], so a game
//! can run on a seeded generator for reproducible matches or on a
//! [`ScriptedRandom`] that replays fixed rolls in tests.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform integer primitive used throughout combat and generation.
pub trait RandomSource {
    /// Return a uniform integer in `[min, max)`.
    ///
    /// Implementations return `min` when the range is empty.
    fn next_in_range(&mut self, min: i64, max: i64) -> i64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_in_range(&mut self, min: i64, max: i64) -> i64 {
        (**self).next_in_range(min, max)
    }
}

/// Seeded pseudo-random generator backed by [`SmallRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    /// Create a generator from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_in_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}

/// Replays a fixed list of rolls.
///
/// Rolls are handed out in order and wrap around once exhausted. A roll
/// that falls outside the requested range is clamped into it, so a script
/// of `[15, 3]` yields exactly 15 and 3 for two d20 rolls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    rolls: VecDeque<i64>,
    consumed: usize,
}

impl ScriptedRandom {
    /// Create a source that replays the given rolls.
    #[must_use]
    pub fn new(rolls: impl IntoIterator<Item = i64>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            consumed: 0,
        }
    }

    /// Number of rolls handed out so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }
}

impl RandomSource for ScriptedRandom {
    fn next_in_range(&mut self, min: i64, max: i64) -> i64 {
        self.consumed += 1;
        let Some(roll) = self.rolls.pop_front() else {
            return min;
        };
        self.rolls.push_back(roll);

        if max <= min {
            min
        } else {
            roll.clamp(min, max - 1)
        }
    }
}

/// Roll a twenty-sided die: uniform in `[1, 20]`.
pub fn roll_d20(rng: &mut dyn RandomSource) -> i64 {
    rng.next_in_range(1, 21)
}

/// Pick a uniform index into a collection of `len` elements.
///
/// Returns `None` for an empty collection.
pub fn pick_index(rng: &mut dyn RandomSource, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let index = rng.next_in_range(0, len as i64);
    usize::try_from(index).ok().filter(|i| *i < len)
}

/// Choose a uniform element from a slice.
pub fn choose<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    pick_index(rng, items.len()).map(|i| &items[i])
}

/// Shuffle a slice in place (Fisher-Yates, Durstenfeld variant).
pub fn shuffle<T>(rng: &mut dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.next_in_range(0, i as i64 + 1);
        let j = usize::try_from(j).unwrap_or(0).min(i);
        items.swap(i, j);
    }
}
