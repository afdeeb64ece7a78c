use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::liveness::liveness::Liveness;
use crate::liveness::liveness_config::LivenessConfig;
use crate::liveness::liveness_events::{LivenessEvent, LivenessEventNotifier};
use crate::messaging::heartbeat_message::HeartbeatTransport;
use crate::messaging::node_addr::PeerAddr;
use crate::scheduling::Scheduler;

pub enum LivenessCommand<A: PeerAddr> {
    StartWatching {
        addr: A,
        expected_interval: Option<Duration>,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    StopWatching {
        addr: A,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    HeartbeatArrived {
        from: A,
    },
    StartSending {
        addr: A,
        transport: Arc<dyn HeartbeatTransport<A>>,
        interval: Duration,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    StopSending {
        addr: A,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    StopAllSenders {
        reply: oneshot::Sender<usize>,
    },
    Sweep {
        urgent: bool,
        reply: oneshot::Sender<Option<usize>>,
    },
    Stats {
        reply: oneshot::Sender<LivenessStats>,
    },
    Shutdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LivenessStats {
    pub num_monitors: usize,
    pub num_senders: usize,
}

/// Spawns a task that exclusively owns a [Liveness] context, and returns a handle for talking
///  to it. All operations go through the task's command channel, so callers on arbitrary tasks
///  or threads are serialized. The task additionally runs a non-urgent timeout sweep every
///  `sweep_tick_interval`.
///
/// Liveness changes are published as [LivenessEvent]s, see [LivenessHandle::subscribe].
///
/// Fails if called outside of a tokio runtime.
pub fn start_liveness<A: PeerAddr>(config: Arc<LivenessConfig>, clock: Arc<dyn Clock>, scheduler: Arc<dyn Scheduler>) -> anyhow::Result<(LivenessHandle<A>, JoinHandle<()>)> {
    let runtime = Handle::try_current()
        .map_err(|e| anyhow!("liveness requires a tokio runtime: {}", e))?;

    let notifier = LivenessEventNotifier::new(config.event_channel_capacity);
    let (send, recv) = mpsc::channel(config.command_channel_capacity.max(1));

    let mut liveness = Liveness::new(config.clone(), clock, scheduler);
    notifier.install_into(liveness.hooks_mut());

    let join_handle = runtime.spawn(run_liveness(liveness, recv, config.sweep_tick_interval));

    let handle = LivenessHandle {
        commands: send,
        notifier,
    };
    Ok((handle, join_handle))
}

/// The command loop, exposed for callers that want to run it on a task of their own choosing.
///  It terminates on [LivenessCommand::Shutdown] or when all command senders are gone, stopping
///  all heartbeat senders on the way out.
pub async fn run_liveness<A: PeerAddr>(mut liveness: Liveness<A>, mut commands: mpsc::Receiver<LivenessCommand<A>>, sweep_tick_interval: Duration) {
    let mut sweep_ticks = time::interval(sweep_tick_interval.max(Duration::from_millis(1)));
    sweep_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(LivenessCommand::Shutdown) | None => break,
                    Some(cmd) => on_command(&mut liveness, cmd),
                }
            }
            _ = sweep_ticks.tick() => {
                liveness.sweep_timeouts(false);
            }
        }
    }

    info!("shutting down liveness");
    liveness.stop_all_senders();
}

fn on_command<A: PeerAddr>(liveness: &mut Liveness<A>, cmd: LivenessCommand<A>) {
    // a reply can only fail to go out if the requester is gone, which is its own business
    match cmd {
        LivenessCommand::StartWatching { addr, expected_interval, reply } => {
            let result = match expected_interval {
                Some(expected_interval) => liveness.start_watching(addr, expected_interval),
                None => liveness.start_watching_default(addr),
            };
            let _ = reply.send(result);
        }
        LivenessCommand::StopWatching { addr, reply } => {
            let _ = reply.send(liveness.stop_watching(&addr));
        }
        LivenessCommand::HeartbeatArrived { from } => {
            liveness.on_heartbeat_arrived(&from);
        }
        LivenessCommand::StartSending { addr, transport, interval, reply } => {
            let _ = reply.send(liveness.start_sending(addr, transport, interval));
        }
        LivenessCommand::StopSending { addr, reply } => {
            let _ = reply.send(liveness.stop_sending(&addr));
        }
        LivenessCommand::StopAllSenders { reply } => {
            let _ = reply.send(liveness.stop_all_senders());
        }
        LivenessCommand::Sweep { urgent, reply } => {
            let _ = reply.send(liveness.sweep_timeouts(urgent));
        }
        LivenessCommand::Stats { reply } => {
            let _ = reply.send(LivenessStats {
                num_monitors: liveness.num_monitors(),
                num_senders: liveness.num_senders(),
            });
        }
        LivenessCommand::Shutdown => {
            debug!("shutdown is handled by the command loop");
        }
    }
}


pub struct LivenessHandle<A: PeerAddr> {
    commands: mpsc::Sender<LivenessCommand<A>>,
    notifier: LivenessEventNotifier<A>,
}
impl <A: PeerAddr> Clone for LivenessHandle<A> {
    fn clone(&self) -> Self {
        LivenessHandle {
            commands: self.commands.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl <A: PeerAddr> LivenessHandle<A> {
    /// Events are buffered per subscriber up to `event_channel_capacity`. A subscriber that
    ///  falls further behind gets [broadcast::error::RecvError::Lagged] and has lost the
    ///  oldest events, `PeerDead` included. Consumers that must see every event should keep
    ///  up with the channel or register hooks on a [Liveness] context directly.
    pub fn subscribe(&self) -> broadcast::Receiver<LivenessEvent<A>> {
        self.notifier.subscribe()
    }

    pub async fn start_watching(&self, addr: A, expected_interval: Duration) -> anyhow::Result<()> {
        self.request(|reply| LivenessCommand::StartWatching { addr, expected_interval: Some(expected_interval), reply }).await?
    }

    pub async fn start_watching_default(&self, addr: A) -> anyhow::Result<()> {
        self.request(|reply| LivenessCommand::StartWatching { addr, expected_interval: None, reply }).await?
    }

    pub async fn stop_watching(&self, addr: A) -> anyhow::Result<()> {
        self.request(|reply| LivenessCommand::StopWatching { addr, reply }).await?
    }

    /// Upcall for the receiving side of the network. This does not wait for the heartbeat to
    ///  be processed.
    pub async fn heartbeat_arrived(&self, from: A) -> anyhow::Result<()> {
        self.send_command(LivenessCommand::HeartbeatArrived { from }).await
    }

    pub async fn start_sending(&self, addr: A, transport: Arc<dyn HeartbeatTransport<A>>, interval: Duration) -> anyhow::Result<()> {
        self.request(|reply| LivenessCommand::StartSending { addr, transport, interval, reply }).await?
    }

    pub async fn stop_sending(&self, addr: A) -> anyhow::Result<()> {
        self.request(|reply| LivenessCommand::StopSending { addr, reply }).await?
    }

    pub async fn stop_all_senders(&self) -> anyhow::Result<usize> {
        self.request(|reply| LivenessCommand::StopAllSenders { reply }).await
    }

    /// Forces an immediate timeout sweep, e.g. before an operation that needs up-to-date
    ///  liveness information.
    pub async fn sweep_now(&self) -> anyhow::Result<usize> {
        let num_dead = self.request(|reply| LivenessCommand::Sweep { urgent: true, reply }).await?;
        Ok(num_dead.unwrap_or_default())
    }

    pub async fn stats(&self) -> anyhow::Result<LivenessStats> {
        self.request(|reply| LivenessCommand::Stats { reply }).await
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send_command(LivenessCommand::Shutdown).await
    }

    async fn send_command(&self, cmd: LivenessCommand<A>) -> anyhow::Result<()> {
        self.commands.send(cmd).await
            .map_err(|_| anyhow!("liveness was shut down"))
    }

    async fn request<T>(&self, cmd: impl FnOnce(oneshot::Sender<T>) -> LivenessCommand<A>) -> anyhow::Result<T> {
        let (reply, result) = oneshot::channel();
        self.send_command(cmd(reply)).await?;
        result.await
            .map_err(|_| anyhow!("liveness was shut down before replying"))
    }
}
