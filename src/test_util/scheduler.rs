use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use crate::scheduling::{ScheduleHandle, ScheduledTask, Scheduler};

struct ManualSchedule {
    period: Duration,
    task: ScheduledTask,
    cancelled: Arc<AtomicBool>,
}

/// A [Scheduler] whose schedules only run when the test says so, via [ManualScheduler::tick_all].
///  It ignores periods for running, but it keeps them for inspection.
#[derive(Default)]
pub struct ManualScheduler {
    schedules: Mutex<Vec<ManualSchedule>>,
    fail_next: AtomicBool,
}
impl ManualScheduler {
    pub fn new() -> ManualScheduler {
        Default::default()
    }

    /// the next call to `repeat()` fails
    pub fn fail_next_repeat(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// runs every schedule that was not cancelled once
    pub fn tick_all(&self) {
        let mut schedules = self.schedules.lock().expect("lock poisoned");
        schedules.retain(|s| !s.cancelled.load(Ordering::SeqCst));
        for s in schedules.iter_mut() {
            (s.task)();
        }
    }

    pub fn num_active(&self) -> usize {
        self.schedules.lock().expect("lock poisoned")
            .iter()
            .filter(|s| !s.cancelled.load(Ordering::SeqCst))
            .count()
    }

    pub fn active_periods(&self) -> Vec<Duration> {
        self.schedules.lock().expect("lock poisoned")
            .iter()
            .filter(|s| !s.cancelled.load(Ordering::SeqCst))
            .map(|s| s.period)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn repeat(&self, period: Duration, task: ScheduledTask) -> anyhow::Result<Box<dyn ScheduleHandle>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("simulated scheduler failure"));
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        self.schedules.lock().expect("lock poisoned")
            .push(ManualSchedule {
                period,
                task,
                cancelled: cancelled.clone(),
            });
        Ok(Box::new(ManualScheduleHandle { cancelled }))
    }
}

struct ManualScheduleHandle {
    cancelled: Arc<AtomicBool>,
}
impl ScheduleHandle for ManualScheduleHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
