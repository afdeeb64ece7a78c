use std::fmt::{Debug, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

/// work that runs once per period of a repeating schedule
pub type ScheduledTask = Box<dyn FnMut() + Send + 'static>;

/// Handle for a repeating schedule. After `cancel()` returns, the task does not run again.
pub trait ScheduleHandle: Send + 'static {
    fn cancel(&mut self);
}

/// The timer facility the liveness core is driven by. It runs periodic work on the core's
///  behalf, the core never runs a loop of its own.
pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` every `period`, the first run happening one full period from now.
    fn repeat(&self, period: Duration, task: ScheduledTask) -> anyhow::Result<Box<dyn ScheduleHandle>>;
}


/// [Scheduler] that spawns a tokio task per schedule
pub struct TokioScheduler {
    runtime: Handle,
}
impl TokioScheduler {
    /// Binds to the tokio runtime of the calling context, failing if there is none.
    pub fn try_current() -> anyhow::Result<TokioScheduler> {
        let runtime = Handle::try_current()
            .map_err(|e| anyhow!("a tokio scheduler requires a tokio runtime: {}", e))?;
        Ok(TokioScheduler { runtime })
    }

    pub fn new(runtime: Handle) -> TokioScheduler {
        TokioScheduler { runtime }
    }
}
impl Debug for TokioScheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokioScheduler")
    }
}

impl Scheduler for TokioScheduler {
    fn repeat(&self, period: Duration, mut task: ScheduledTask) -> anyhow::Result<Box<dyn ScheduleHandle>> {
        if period.is_zero() {
            return Err(anyhow!("a repeating schedule requires a non-zero period"));
        }

        // the first deadline is relative to this call, not to when the spawned task first runs
        let start = Instant::now() + period;
        let join_handle = self.runtime.spawn(async move {
            let mut ticks = time::interval_at(start, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                task();
            }
        });
        trace!("started repeating schedule every {:?}", period);
        Ok(Box::new(TokioScheduleHandle { join_handle }))
    }
}

struct TokioScheduleHandle {
    join_handle: JoinHandle<()>,
}
impl ScheduleHandle for TokioScheduleHandle {
    fn cancel(&mut self) {
        self.join_handle.abort();
    }
}
