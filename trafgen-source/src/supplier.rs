//! Value suppliers for payload lengths and send intervals.
//!
//! A supplier is queried once per emitted unit (lengths) or once per rearm (intervals). Any
//! `FnMut() -> T` closure is a supplier, which makes deterministic test doubles trivial.

use std::time::Duration;

use rand::{
    distributions::{uniform::SampleUniform, Distribution, Uniform as UniformDist},
    rngs::StdRng,
    Rng, SeedableRng,
};

/// A source of values, deterministic or random.
pub trait ValueSupplier<T> {
    fn next_value(&mut self) -> T;
}

impl<T, F> ValueSupplier<T> for F
where
    F: FnMut() -> T,
{
    fn next_value(&mut self) -> T {
        self()
    }
}

/// Always supplies the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant<T>(pub T);

impl<T: Clone> ValueSupplier<T> for Constant<T> {
    #[inline]
    fn next_value(&mut self) -> T {
        self.0.clone()
    }
}

/// Draws values uniformly from an inclusive range.
pub struct Uniform<T: SampleUniform> {
    dist: UniformDist<T>,
    rng: StdRng,
}

impl<T: SampleUniform> std::fmt::Debug for Uniform<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uniform").finish_non_exhaustive()
    }
}

impl<T: SampleUniform> Uniform<T> {
    /// Creates a supplier over `low..=high`, seeded with `seed`.
    ///
    /// # Panics
    /// Panics if `low > high`.
    pub fn new_inclusive(low: T, high: T, seed: u64) -> Self {
        Self { dist: UniformDist::new_inclusive(low, high), rng: StdRng::seed_from_u64(seed) }
    }
}

impl<T: SampleUniform> ValueSupplier<T> for Uniform<T> {
    fn next_value(&mut self) -> T {
        self.dist.sample(&mut self.rng)
    }
}

/// Draws exponentially distributed intervals, i.e. a Poisson arrival process.
#[derive(Debug)]
pub struct Exponential {
    mean: Duration,
    rng: StdRng,
}

impl Exponential {
    pub fn new(mean: Duration, seed: u64) -> Self {
        Self { mean, rng: StdRng::seed_from_u64(seed) }
    }
}

impl ValueSupplier<Duration> for Exponential {
    fn next_value(&mut self) -> Duration {
        // Inverse transform sampling. `1 - u` lies in (0, 1], so the factor is finite and >= 0.
        let u: f64 = self.rng.gen();
        self.mean.mul_f64(-(1.0 - u).ln())
    }
}
