use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::liveness::liveness_config::LivenessConfig;
use crate::messaging::heartbeat_message::{HeartbeatMessage, HeartbeatTransport};
use crate::messaging::node_addr::PeerAddr;
use crate::scheduling::{ScheduleHandle, ScheduledTask, Scheduler};

/// Sending side for one peer: owns a repeating schedule that sends a heartbeat to the peer
///  on every tick. Dropping the sender cancels the schedule.
pub struct OutgoingHeartbeat<A: PeerAddr> {
    peer_addr: A,
    requested_interval: Duration,
    send_interval: Duration,
    schedule: Box<dyn ScheduleHandle>,
}

impl <A: PeerAddr> OutgoingHeartbeat<A> {
    /// The first heartbeat goes out one full interval after this call: sending right away
    ///  would reach a peer that has likely not started watching us yet, i.e. a martian.
    pub fn start(
        peer_addr: A,
        transport: Arc<dyn HeartbeatTransport<A>>,
        requested_interval: Duration,
        config: &LivenessConfig,
        scheduler: &dyn Scheduler,
    ) -> anyhow::Result<OutgoingHeartbeat<A>> {
        let send_interval = effective_send_interval(requested_interval, config);
        let task = heartbeat_task(peer_addr.clone(), transport);
        let schedule = scheduler.repeat(send_interval, task)?;

        debug!("sending heartbeats to {:?} every {:?} (requested {:?})", peer_addr, send_interval, requested_interval);
        Ok(OutgoingHeartbeat {
            peer_addr,
            requested_interval,
            send_interval,
            schedule,
        })
    }

    pub fn peer_addr(&self) -> &A {
        &self.peer_addr
    }

    pub fn requested_interval(&self) -> Duration {
        self.requested_interval
    }

    /// the period the schedule actually runs with
    pub fn send_interval(&self) -> Duration {
        self.send_interval
    }

    pub fn is_sending_to(&self, addr: &A) -> bool {
        &self.peer_addr == addr
    }
}

impl <A: PeerAddr> Drop for OutgoingHeartbeat<A> {
    fn drop(&mut self) {
        self.schedule.cancel();
        debug!("stopped sending heartbeats to {:?}", self.peer_addr);
    }
}

/// Requested intervals below the configured minimum would flood the network, they are
///  raised to the minimum.
pub fn effective_send_interval(requested: Duration, config: &LivenessConfig) -> Duration {
    requested.max(config.min_send_interval)
}

fn heartbeat_task<A: PeerAddr>(to: A, transport: Arc<dyn HeartbeatTransport<A>>) -> ScheduledTask {
    let mut sequence: u64 = 0;
    Box::new(move || {
        sequence += 1;
        trace!("sending heartbeat #{} to {:?}", sequence, to);
        transport.send(&to, HeartbeatMessage::new(sequence));
    })
}
