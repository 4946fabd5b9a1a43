use std::{
    fmt,
    ops::{Add, AddAssign},
    time::Duration,
};

/// A point on the virtual clock of the hosting event-driven environment.
///
/// Virtual time starts at [`SimTime::ZERO`] and only ever moves forward. It is independent of
/// the wall clock: the host decides when time advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// The largest representable point in time.
    pub const MAX: Self = Self(Duration::MAX);

    #[inline]
    pub const fn from_duration(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    /// Returns the time elapsed since [`SimTime::ZERO`].
    #[inline]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Adds `delta`, clamping at [`SimTime::MAX`] instead of overflowing.
    #[inline]
    pub fn saturating_add(self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Returns the time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[inline]
    pub fn saturating_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<Duration> for SimTime {
    fn from(elapsed: Duration) -> Self {
        Self(elapsed)
    }
}

impl Add<Duration> for SimTime {
    type Output = Self;

    /// Saturates at [`SimTime::MAX`]; the virtual clock never wraps.
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0.as_secs_f64())
    }
}

#[allow(non_upper_case_globals)]
pub mod constants {
    pub const KiB: u32 = 1024;
    pub const MiB: u32 = 1024 * KiB;
    pub const GiB: u32 = 1024 * MiB;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_time_ordering_and_arithmetic() {
        let start = SimTime::from_secs(5);
        let now = SimTime::from_millis(4_500);

        assert_eq!(start.max(now), start);
        assert_eq!(now + Duration::from_millis(500), start);
        assert_eq!(start.saturating_since(now), Duration::from_millis(500));
        assert_eq!(now.saturating_since(start), Duration::ZERO);
    }

    #[test]
    fn sim_time_saturates() {
        assert_eq!(SimTime::MAX + Duration::from_secs(1), SimTime::MAX);
    }

    #[test]
    fn sim_time_display() {
        assert_eq!(SimTime::from_millis(1_250).to_string(), "1.250000s");
    }
}
