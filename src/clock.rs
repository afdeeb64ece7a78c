use std::fmt::{Debug, Formatter};
use std::ops::Add;
use std::time::Duration;

use tokio::time::Instant;

/// A point in time, measured in microseconds since some clock specific origin. Timestamps
///  are only comparable if they come from the same [Clock].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(micros: u64) -> Timestamp {
        Timestamp(micros)
    }

    pub fn from_duration(since_origin: Duration) -> Timestamp {
        Timestamp(duration_as_micros(since_origin))
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// zero if `earlier` is actually later than `self`
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration_as_micros(rhs)))
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.0)
    }
}

fn duration_as_micros(d: Duration) -> u64 {
    d.as_micros().try_into().unwrap_or(u64::MAX)
}


/// Monotonic time source. All deadlines in a liveness context are computed from the
///  same clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// [Clock] based on tokio's [Instant], which makes it follow paused / advanced time in tests.
pub struct MonotonicClock {
    origin: Instant,
}
impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.origin.elapsed())
    }
}
