//! Random sources for offsets, bit indices and sleep durations.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Anything that can draw a uniform integer from an inclusive range.
pub trait RandomSource {
    /// Uniform value in `low..=high`. Callers guarantee `low <= high`.
    fn uniform(&mut self, low: u64, high: u64) -> u64;
}

/// A [`RandomSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl RngSource<ThreadRng> {
    /// The thread-local generator, seeded from the OS once per thread.
    pub fn thread() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl RngSource<StdRng> {
    /// A reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, low: u64, high: u64) -> u64 {
        self.rng.gen_range(low..=high)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn uniform(&mut self, low: u64, high: u64) -> u64 {
        (**self).uniform(low, high)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn uniform(&mut self, low: u64, high: u64) -> u64 {
        (**self).uniform(low, high)
    }
}

/// Replays a fixed list of values.
///
/// Each draw pops the next value and clamps it into the requested range.
/// Once exhausted it keeps returning `low`.
///
/// ```rust
/// use bit_flipper::{RandomSource, ScriptedSource};
///
/// let mut source = ScriptedSource::new([5, 3]);
/// assert_eq!(source.uniform(0, 15), 5);
/// assert_eq!(source.uniform(0, 7), 3);
/// assert_eq!(source.uniform(2, 7), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    values: VecDeque<u64>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Values not yet drawn.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self, low: u64, high: u64) -> u64 {
        self.values
            .pop_front()
            .map_or(low, |value| value.clamp(low, high))
    }
}
