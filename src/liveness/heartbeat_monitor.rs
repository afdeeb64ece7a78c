use std::time::Duration;

use crate::clock::Timestamp;
use crate::messaging::node_addr::PeerAddr;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum HeartbeatStatus {
    Receiving,
    TimedOut,
}

/// What a single heartbeat arrival means for a monitor, evaluated before the monitor's
///  deadlines are moved forward.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ArrivalOutcome {
    OnTime,
    /// arrived after the warn deadline while still receiving; lateness in whole milliseconds
    Late(Duration),
    /// first heartbeat after the peer was declared dead; lateness relative to the dead deadline
    CameAlive(Duration),
}

/// The watching side's state for one peer.
///
/// There are two deadlines with different severities. Passing the warn deadline is only
///  noticed when the next heartbeat arrives, and it reports how late that heartbeat was.
///  Passing the dead deadline is only noticed by the periodic timeout sweep, because no
///  heartbeat arrives to notice it.
#[derive(Debug)]
pub struct IncomingHeartbeatMonitor<A: PeerAddr> {
    peer_addr: A,
    expected_interval: Duration,
    warn_interval: Duration,
    dead_deadline: Timestamp,
    warn_deadline: Timestamp,
    status: HeartbeatStatus,
}

impl <A: PeerAddr> IncomingHeartbeatMonitor<A> {
    pub fn new(peer_addr: A, expected_interval: Duration, warn_interval: Duration, now: Timestamp) -> IncomingHeartbeatMonitor<A> {
        IncomingHeartbeatMonitor {
            peer_addr,
            expected_interval,
            warn_interval,
            dead_deadline: now + expected_interval,
            warn_deadline: now + warn_interval,
            status: HeartbeatStatus::Receiving,
        }
    }

    pub fn peer_addr(&self) -> &A {
        &self.peer_addr
    }

    pub fn expected_interval(&self) -> Duration {
        self.expected_interval
    }

    pub fn warn_interval(&self) -> Duration {
        self.warn_interval
    }

    pub fn dead_deadline(&self) -> Timestamp {
        self.dead_deadline
    }

    pub fn warn_deadline(&self) -> Timestamp {
        self.warn_deadline
    }

    pub fn status(&self) -> HeartbeatStatus {
        self.status
    }

    pub fn is_watching(&self, addr: &A) -> bool {
        &self.peer_addr == addr
    }

    pub fn classify_arrival(&self, now: Timestamp) -> ArrivalOutcome {
        match self.status {
            HeartbeatStatus::TimedOut => {
                ArrivalOutcome::CameAlive(now.saturating_duration_since(self.dead_deadline))
            }
            HeartbeatStatus::Receiving if now > self.warn_deadline => {
                let how_late = now.saturating_duration_since(self.warn_deadline);
                ArrivalOutcome::Late(Duration::from_millis(how_late.as_millis() as u64))
            }
            HeartbeatStatus::Receiving => ArrivalOutcome::OnTime,
        }
    }

    /// Marks the peer as receiving and moves both deadlines relative to `now`.
    pub fn record_arrival(&mut self, now: Timestamp) {
        self.status = HeartbeatStatus::Receiving;
        self.dead_deadline = now + self.expected_interval;
        self.warn_deadline = now + self.warn_interval;
    }

    /// A peer is overdue once: after it was declared dead, only a heartbeat brings it back.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.status == HeartbeatStatus::Receiving && now > self.dead_deadline
    }

    pub fn mark_timed_out(&mut self) {
        self.status = HeartbeatStatus::TimedOut;
    }
}
