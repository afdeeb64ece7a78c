use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::{Clock, Timestamp};

/// A [Clock] that only moves when told to. Starts at zero.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}
impl ManualClock {
    pub fn new() -> ManualClock {
        Default::default()
    }

    pub fn set(&self, now: Timestamp) {
        self.micros.store(now.as_micros(), Ordering::SeqCst);
    }

    pub fn set_micros(&self, micros: u64) {
        self.micros.store(micros, Ordering::SeqCst);
    }

    pub fn set_secs(&self, secs: u64) {
        self.set_micros(secs * 1_000_000);
    }

    pub fn advance(&self, d: Duration) {
        let now = self.now() + d;
        self.set(now);
    }
}
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}
