use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Timestamp};
use crate::liveness::heartbeat_monitor::{ArrivalOutcome, IncomingHeartbeatMonitor};
use crate::liveness::heartbeat_sender::OutgoingHeartbeat;
use crate::liveness::liveness_config::LivenessConfig;
use crate::liveness::liveness_events::LivenessHooks;
use crate::liveness::registry::Registry;
use crate::messaging::heartbeat_message::HeartbeatTransport;
use crate::messaging::node_addr::PeerAddr;
use crate::scheduling::Scheduler;

/// One self-contained liveness subsystem: the peers we watch, the peers we heartbeat to, and
///  the hooks that report liveness changes.
///
/// All operations are synchronous and non-blocking, and they assume a single caller at a time.
///  They are driven from the outside, by the scheduler's ticks and by heartbeat arrivals; see
///  [crate::liveness::liveness_driver] for a driver that serializes concurrent callers.
pub struct Liveness<A: PeerAddr> {
    config: Arc<LivenessConfig>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    monitors: Registry<IncomingHeartbeatMonitor<A>>,
    senders: Registry<OutgoingHeartbeat<A>>,
    hooks: LivenessHooks<A>,
    last_sweep: Option<Timestamp>,
}

impl <A: PeerAddr> Liveness<A> {
    pub fn new(config: Arc<LivenessConfig>, clock: Arc<dyn Clock>, scheduler: Arc<dyn Scheduler>) -> Liveness<A> {
        Liveness {
            config,
            clock,
            scheduler,
            monitors: Default::default(),
            senders: Default::default(),
            hooks: Default::default(),
            last_sweep: None,
        }
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn hooks_mut(&mut self) -> &mut LivenessHooks<A> {
        &mut self.hooks
    }

    pub fn set_dead_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>) + Send + Sync + 'static) {
        self.hooks.set_dead_hook(hook);
    }

    pub fn set_warn_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync + 'static) {
        self.hooks.set_warn_hook(hook);
    }

    pub fn set_come_alive_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync + 'static) {
        self.hooks.set_come_alive_hook(hook);
    }

    pub fn set_martian_hook(&mut self, hook: impl Fn(&A) + Send + Sync + 'static) {
        self.hooks.set_martian_hook(hook);
    }

    /// Start expecting a heartbeat from `addr` at least every `expected_interval`. The clock
    ///  starts now, i.e. the peer has one expected interval for its first heartbeat.
    pub fn start_watching(&mut self, addr: A, expected_interval: Duration) -> anyhow::Result<()> {
        if self.monitors.contains(|m| m.is_watching(&addr)) {
            warn!("attempt to watch {:?} twice - ignoring", addr);
            return Err(anyhow!("already watching {:?}", addr));
        }

        let warn_interval = self.config.warn_interval(expected_interval);
        let monitor = IncomingHeartbeatMonitor::new(addr, expected_interval, warn_interval, self.clock.now());
        debug!("watching {:?}: expecting heartbeats every {:?}, warning after {:?}", monitor.peer_addr(), expected_interval, warn_interval);
        self.monitors.add(monitor)
    }

    pub fn start_watching_default(&mut self, addr: A) -> anyhow::Result<()> {
        let expected_interval = self.config.default_expected_interval;
        self.start_watching(addr, expected_interval)
    }

    pub fn stop_watching(&mut self, addr: &A) -> anyhow::Result<()> {
        match self.monitors.remove_first(|m| m.is_watching(addr)) {
            Some(monitor) => {
                debug!("stopped watching {:?}", monitor.peer_addr());
                Ok(())
            }
            None => {
                warn!("attempt to stop watching {:?} which is not being watched", addr);
                Err(anyhow!("not watching {:?}", addr))
            }
        }
    }

    /// Dispatch for a heartbeat that arrived from `from`.
    pub fn on_heartbeat_arrived(&mut self, from: &A) {
        let now = self.clock.now();
        let hooks = &self.hooks;

        let Some(monitor) = self.monitors.find_mut(|m| m.is_watching(from)) else {
            warn!("received a heartbeat from {:?} which is not being watched", from);
            hooks.fire_martian(from);
            return;
        };

        match monitor.classify_arrival(now) {
            ArrivalOutcome::CameAlive(how_late) => {
                info!("{:?} is back alive, {:?} after it was declared dead", from, how_late);
                hooks.fire_come_alive(monitor, how_late);
            }
            ArrivalOutcome::Late(how_late) => {
                warn!("{:?} is {}ms late in sending its heartbeat", from, how_late.as_millis());
                hooks.fire_warn(monitor, how_late);
            }
            ArrivalOutcome::OnTime => {}
        }
        monitor.record_arrival(now);
    }

    /// Declares every receiving peer whose dead deadline has passed dead.
    ///
    /// A non-urgent sweep within `sweep_min_interval` of the previous sweep does nothing and
    ///  returns `None`. Otherwise the number of peers that were newly declared dead is returned.
    pub fn sweep_timeouts(&mut self, urgent: bool) -> Option<usize> {
        let now = self.clock.now();
        if !urgent {
            if let Some(last_sweep) = self.last_sweep {
                if now.saturating_duration_since(last_sweep) < self.config.sweep_min_interval {
                    return None;
                }
            }
        }
        self.last_sweep = Some(now);

        let hooks = &self.hooks;
        let mut num_dead = 0;
        for monitor in self.monitors.iter_mut() {
            if monitor.is_overdue(now) {
                warn!("{:?} looks dead from here: no heartbeat since {:?}", monitor.peer_addr(), monitor.dead_deadline());
                hooks.fire_dead(monitor);
                monitor.mark_timed_out();
                num_dead += 1;
            }
        }
        Some(num_dead)
    }

    /// Start sending heartbeats to `addr` through `transport`, see [OutgoingHeartbeat::start]
    ///  for timing details.
    pub fn start_sending(&mut self, addr: A, transport: Arc<dyn HeartbeatTransport<A>>, interval: Duration) -> anyhow::Result<()> {
        if self.senders.contains(|s| s.is_sending_to(&addr)) {
            warn!("attempt to send heartbeats to {:?} twice - ignoring", addr);
            return Err(anyhow!("already sending heartbeats to {:?}", addr));
        }

        let sender = OutgoingHeartbeat::start(addr, transport, interval, &self.config, self.scheduler.as_ref())?;
        // if registering fails, the sender is dropped here, which cancels its schedule
        self.senders.add(sender)
    }

    pub fn stop_sending(&mut self, addr: &A) -> anyhow::Result<()> {
        match self.senders.remove_first(|s| s.is_sending_to(addr)) {
            Some(sender) => {
                drop(sender);
                Ok(())
            }
            None => {
                warn!("attempt to stop sending heartbeats to {:?} which is not being sent to", addr);
                Err(anyhow!("not sending heartbeats to {:?}", addr))
            }
        }
    }

    /// returns the number of senders that were stopped
    pub fn stop_all_senders(&mut self) -> usize {
        let senders = self.senders.drain();
        let num_stopped = senders.len();
        for sender in senders {
            drop(sender);
        }
        if num_stopped > 0 {
            info!("stopped all {} heartbeat senders", num_stopped);
        }
        num_stopped
    }

    pub fn num_monitors(&self) -> usize {
        self.monitors.len()
    }

    pub fn num_senders(&self) -> usize {
        self.senders.len()
    }

    pub fn monitor(&self, addr: &A) -> Option<&IncomingHeartbeatMonitor<A>> {
        self.monitors.find(|m| m.is_watching(addr))
    }

    pub fn monitors(&self) -> impl Iterator<Item = &IncomingHeartbeatMonitor<A>> {
        self.monitors.iter()
    }

    pub fn sender(&self, addr: &A) -> Option<&OutgoingHeartbeat<A>> {
        self.senders.find(|s| s.is_sending_to(addr))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use rstest::rstest;

    use crate::liveness::heartbeat_monitor::HeartbeatStatus;
    use crate::liveness::liveness_events::{LivenessEvent, MartianData, PeerCameAliveData, PeerDeadData, PeerLateData};
    use crate::messaging::heartbeat_message::HeartbeatMessage;
    use crate::messaging::node_addr::NodeAddr;
    use crate::test_util::clock::ManualClock;
    use crate::test_util::event::record_events;
    use crate::test_util::node::test_node_addr_from_number;
    use crate::test_util::scheduler::ManualScheduler;
    use crate::test_util::transport::TrackingHeartbeatTransport;
    use super::*;

    struct Fixture {
        clock: Arc<ManualClock>,
        scheduler: Arc<ManualScheduler>,
        liveness: Liveness<NodeAddr>,
        events: Arc<Mutex<Vec<LivenessEvent<NodeAddr>>>>,
    }
    impl Fixture {
        fn new() -> Fixture {
            let clock = Arc::new(ManualClock::new());
            let scheduler = Arc::new(ManualScheduler::new());
            let mut liveness = Liveness::new(Arc::new(LivenessConfig::new()), clock.clone(), scheduler.clone());
            let events = record_events(liveness.hooks_mut());
            Fixture { clock, scheduler, liveness, events }
        }

        fn take_events(&self) -> Vec<LivenessEvent<NodeAddr>> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    fn dead(n: u16) -> LivenessEvent<NodeAddr> {
        LivenessEvent::PeerDead(PeerDeadData { addr: test_node_addr_from_number(n) })
    }
    fn late(n: u16, millis: u64) -> LivenessEvent<NodeAddr> {
        LivenessEvent::PeerLate(PeerLateData { addr: test_node_addr_from_number(n), how_late: Duration::from_millis(millis) })
    }
    fn came_alive(n: u16, how_late: Duration) -> LivenessEvent<NodeAddr> {
        LivenessEvent::PeerCameAlive(PeerCameAliveData { addr: test_node_addr_from_number(n), how_late })
    }
    fn martian(n: u16) -> LivenessEvent<NodeAddr> {
        LivenessEvent::Martian(MartianData { addr: test_node_addr_from_number(n) })
    }

    #[test]
    fn test_start_watching_sets_deadlines() {
        let mut f = Fixture::new();
        f.clock.set_secs(10);
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.status(), HeartbeatStatus::Receiving);
        assert_eq!(monitor.dead_deadline(), Timestamp::from_micros(14_000_000));
        assert_eq!(monitor.warn_deadline(), Timestamp::from_micros(11_000_000));
        assert_eq!(f.liveness.num_monitors(), 1);
    }

    #[test]
    fn test_start_watching_default_interval() {
        let mut f = Fixture::new();
        f.liveness.start_watching_default(test_node_addr_from_number(1)).unwrap();

        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.expected_interval(), f.liveness.config().default_expected_interval);
        assert_eq!(monitor.expected_interval(), Duration::from_secs(60));
        assert_eq!(monitor.warn_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_watching_twice_is_rejected() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        assert!(f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(8)).is_err());

        assert_eq!(f.liveness.num_monitors(), 1);
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().expected_interval(), Duration::from_secs(4));
    }

    #[test]
    fn test_no_heartbeat_means_dead_exactly_once_and_never_late() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        for t in 0..=4 {
            f.clock.set_secs(t);
            assert_eq!(f.liveness.sweep_timeouts(false), Some(0));
        }
        assert!(f.take_events().is_empty());

        f.clock.set_micros(4_000_001);
        assert_eq!(f.liveness.sweep_timeouts(true), Some(1));
        assert_eq!(f.take_events(), vec![dead(1)]);
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().status(), HeartbeatStatus::TimedOut);

        for t in 6..20 {
            f.clock.set_secs(t);
            assert_eq!(f.liveness.sweep_timeouts(false), Some(0));
        }
        assert!(f.take_events().is_empty());
    }

    #[test]
    fn test_dead_hook_sees_monitor_before_timeout() {
        let mut f = Fixture::new();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let s = statuses.clone();
        f.liveness.set_dead_hook(move |m| s.lock().unwrap().push(m.status()));

        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        f.clock.set_secs(5);
        f.liveness.sweep_timeouts(true);

        assert_eq!(*statuses.lock().unwrap(), vec![HeartbeatStatus::Receiving]);
    }

    #[test]
    fn test_recovery_reports_lateness_relative_to_dead_deadline() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_secs(5);
        f.liveness.sweep_timeouts(false);
        assert_eq!(f.take_events(), vec![dead(1)]);

        f.clock.set_micros(7_500_250);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));
        assert_eq!(f.take_events(), vec![came_alive(1, Duration::from_micros(3_500_250))]);

        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.status(), HeartbeatStatus::Receiving);
        assert_eq!(monitor.dead_deadline(), Timestamp::from_micros(11_500_250));
        assert_eq!(monitor.warn_deadline(), Timestamp::from_micros(8_500_250));

        // silent again after recovery: dead a second time once the new deadline has passed
        f.clock.set_micros(11_500_250);
        assert_eq!(f.liveness.sweep_timeouts(true), Some(0));
        f.clock.set_micros(11_500_251);
        assert_eq!(f.liveness.sweep_timeouts(true), Some(1));
        assert_eq!(f.take_events(), vec![dead(1)]);
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().status(), HeartbeatStatus::TimedOut);

        f.clock.set_secs(12);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));
        assert_eq!(f.take_events(), vec![came_alive(1, Duration::from_micros(499_750))]);
    }

    #[test]
    fn test_come_alive_hook_sees_timed_out_monitor() {
        let mut f = Fixture::new();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let s = statuses.clone();
        f.liveness.set_come_alive_hook(move |m, _| s.lock().unwrap().push((m.status(), m.dead_deadline())));

        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        f.clock.set_secs(5);
        f.liveness.sweep_timeouts(false);
        f.clock.set_secs(6);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));

        assert_eq!(*statuses.lock().unwrap(), vec![(HeartbeatStatus::TimedOut, Timestamp::from_micros(4_000_000))]);
    }

    #[rstest]
    #[case::on_time(500, vec![])]
    #[case::at_warn_deadline(1000, vec![])]
    #[case::late(2500, vec![late(1, 1500)])]
    #[case::at_dead_deadline(4000, vec![late(1, 3000)])]
    fn test_arrival_while_receiving(#[case] arrival_millis: u64, #[case] expected: Vec<LivenessEvent<NodeAddr>>) {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_micros(arrival_millis * 1000);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));

        assert_eq!(f.take_events(), expected);
        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.status(), HeartbeatStatus::Receiving);
        assert_eq!(monitor.dead_deadline(), Timestamp::from_micros(arrival_millis * 1000 + 4_000_000));
    }

    #[test]
    fn test_arrival_after_dead_deadline_without_sweep_is_only_late() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_secs(1);
        assert_eq!(f.liveness.sweep_timeouts(false), Some(0));

        f.clock.set_secs(5);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));
        assert_eq!(f.take_events(), vec![late(1, 4000)]);
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().dead_deadline(), Timestamp::from_micros(9_000_000));

        f.clock.set_secs(9);
        assert_eq!(f.liveness.sweep_timeouts(true), Some(0));
        assert!(f.take_events().is_empty());
    }

    #[test]
    fn test_martian() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_secs(3);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(2));
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1).next_incarnation());

        assert_eq!(f.take_events(), vec![martian(2), LivenessEvent::Martian(MartianData { addr: test_node_addr_from_number(1).next_incarnation() })]);
        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.dead_deadline(), Timestamp::from_micros(4_000_000));
        assert_eq!(monitor.warn_deadline(), Timestamp::from_micros(1_000_000));
        assert_eq!(monitor.status(), HeartbeatStatus::Receiving);
    }

    #[test]
    fn test_arrival_only_updates_matching_monitor() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        f.liveness.start_watching(test_node_addr_from_number(2), Duration::from_secs(4)).unwrap();

        f.clock.set_secs(3);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(2));

        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().dead_deadline(), Timestamp::from_micros(4_000_000));
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(2)).unwrap().dead_deadline(), Timestamp::from_micros(7_000_000));

        f.clock.set_secs(5);
        f.liveness.sweep_timeouts(false);
        assert_eq!(f.take_events(), vec![late(2, 2000), dead(1)]);
    }

    #[test]
    fn test_non_urgent_sweeps_are_rate_limited() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_micros(3_500_000);
        assert_eq!(f.liveness.sweep_timeouts(false), Some(0));

        // dead deadline has passed, but the previous sweep was less than a second ago
        f.clock.set_micros(4_400_000);
        assert_eq!(f.liveness.sweep_timeouts(false), None);
        assert!(f.take_events().is_empty());
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().status(), HeartbeatStatus::Receiving);

        f.clock.set_micros(4_500_000);
        assert_eq!(f.liveness.sweep_timeouts(false), Some(1));
        assert_eq!(f.take_events(), vec![dead(1)]);
    }

    #[test]
    fn test_urgent_sweep_ignores_rate_limit() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_micros(3_900_000);
        assert_eq!(f.liveness.sweep_timeouts(false), Some(0));

        f.clock.set_micros(4_000_001);
        assert_eq!(f.liveness.sweep_timeouts(true), Some(1));
        assert_eq!(f.take_events(), vec![dead(1)]);

        // an urgent sweep counts as the most recent sweep for rate limiting
        f.clock.set_micros(4_500_000);
        assert_eq!(f.liveness.sweep_timeouts(false), None);
    }

    #[test]
    fn test_stop_watching() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        f.liveness.start_watching(test_node_addr_from_number(2), Duration::from_secs(4)).unwrap();

        f.liveness.stop_watching(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(f.liveness.num_monitors(), 1);
        assert!(f.liveness.monitor(&test_node_addr_from_number(1)).is_none());
        assert_eq!(f.liveness.monitors().map(|m| *m.peer_addr()).collect::<Vec<_>>(), vec![test_node_addr_from_number(2)]);

        assert!(f.liveness.stop_watching(&test_node_addr_from_number(1)).is_err());
        assert_eq!(f.liveness.num_monitors(), 1);

        // unwatched peers become martians, and they are not declared dead
        f.clock.set_secs(10);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));
        f.liveness.sweep_timeouts(true);
        assert_eq!(f.take_events(), vec![martian(1), dead(2)]);
    }

    #[test]
    fn test_rewatch_after_stop_starts_fresh() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        f.clock.set_secs(5);
        f.liveness.sweep_timeouts(true);
        f.liveness.stop_watching(&test_node_addr_from_number(1)).unwrap();

        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(2)).unwrap();
        let monitor = f.liveness.monitor(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(monitor.status(), HeartbeatStatus::Receiving);
        assert_eq!(monitor.dead_deadline(), Timestamp::from_micros(7_000_000));
        assert_eq!(monitor.warn_deadline(), Timestamp::from_micros(5_500_000));
    }

    #[test]
    fn test_scenario_late_heartbeat_before_any_dead_sweep() {
        let mut f = Fixture::new();
        f.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();

        f.clock.set_secs(1);
        assert_eq!(f.liveness.sweep_timeouts(false), Some(0));

        f.clock.set_secs(5);
        f.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));
        assert_eq!(f.take_events(), vec![late(1, 4000)]);
        assert_eq!(f.liveness.monitor(&test_node_addr_from_number(1)).unwrap().dead_deadline(), Timestamp::from_micros(9_000_000));
    }

    #[test]
    fn test_start_sending() {
        let mut f = Fixture::new();
        let transport = Arc::new(TrackingHeartbeatTransport::new());

        f.liveness.start_sending(test_node_addr_from_number(1), transport.clone(), Duration::from_millis(200)).unwrap();
        assert_eq!(f.liveness.num_senders(), 1);
        assert_eq!(f.liveness.sender(&test_node_addr_from_number(1)).unwrap().send_interval(), Duration::from_secs(1));
        assert_eq!(f.scheduler.active_periods(), vec![Duration::from_secs(1)]);
        assert!(transport.sent_messages().is_empty());

        f.scheduler.tick_all();
        assert_eq!(transport.sent_messages(), vec![(test_node_addr_from_number(1), HeartbeatMessage::new(1))]);
    }

    #[test]
    fn test_sending_twice_is_rejected() {
        let mut f = Fixture::new();
        let transport = Arc::new(TrackingHeartbeatTransport::new());

        f.liveness.start_sending(test_node_addr_from_number(1), transport.clone(), Duration::from_secs(2)).unwrap();
        assert!(f.liveness.start_sending(test_node_addr_from_number(1), transport.clone(), Duration::from_secs(3)).is_err());
        assert_eq!(f.liveness.num_senders(), 1);
        assert_eq!(f.scheduler.num_active(), 1);
    }

    #[test]
    fn test_failed_start_sending_leaves_no_state() {
        let mut f = Fixture::new();
        f.scheduler.fail_next_repeat();

        let result = f.liveness.start_sending(test_node_addr_from_number(1), Arc::new(TrackingHeartbeatTransport::new()), Duration::from_secs(2));
        assert!(result.is_err());
        assert_eq!(f.liveness.num_senders(), 0);
        assert_eq!(f.scheduler.num_active(), 0);
    }

    #[test]
    fn test_stop_sending() {
        let mut f = Fixture::new();
        let transport = Arc::new(TrackingHeartbeatTransport::new());
        f.liveness.start_sending(test_node_addr_from_number(1), transport.clone(), Duration::from_secs(1)).unwrap();
        f.liveness.start_sending(test_node_addr_from_number(2), transport.clone(), Duration::from_secs(1)).unwrap();

        f.liveness.stop_sending(&test_node_addr_from_number(1)).unwrap();
        assert_eq!(f.liveness.num_senders(), 1);
        assert_eq!(f.scheduler.num_active(), 1);

        f.scheduler.tick_all();
        assert_eq!(transport.sent_messages(), vec![(test_node_addr_from_number(2), HeartbeatMessage::new(1))]);

        assert!(f.liveness.stop_sending(&test_node_addr_from_number(1)).is_err());
        assert_eq!(f.liveness.num_senders(), 1);
        assert!(f.take_events().is_empty());
    }

    #[test]
    fn test_stop_all_senders() {
        let mut f = Fixture::new();
        let transport = Arc::new(TrackingHeartbeatTransport::new());
        for n in 1..=5 {
            f.liveness.start_sending(test_node_addr_from_number(n), transport.clone(), Duration::from_secs(1)).unwrap();
        }
        assert_eq!(f.scheduler.num_active(), 5);

        assert_eq!(f.liveness.stop_all_senders(), 5);
        assert_eq!(f.liveness.num_senders(), 0);
        assert_eq!(f.scheduler.num_active(), 0);

        f.scheduler.tick_all();
        assert!(transport.sent_messages().is_empty());
        assert_eq!(f.liveness.stop_all_senders(), 0);
    }

    #[test]
    fn test_dropping_context_cancels_schedules() {
        let f = Fixture::new();
        let Fixture { scheduler, mut liveness, .. } = f;
        let transport = Arc::new(TrackingHeartbeatTransport::new());
        liveness.start_sending(test_node_addr_from_number(1), transport, Duration::from_secs(1)).unwrap();
        assert_eq!(scheduler.num_active(), 1);

        drop(liveness);
        assert_eq!(scheduler.num_active(), 0);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut a = Fixture::new();
        let mut b = Fixture::new();

        a.liveness.start_watching(test_node_addr_from_number(1), Duration::from_secs(4)).unwrap();
        b.liveness.on_heartbeat_arrived(&test_node_addr_from_number(1));

        assert!(a.take_events().is_empty());
        assert_eq!(b.take_events(), vec![martian(1)]);
        assert_eq!(b.liveness.num_monitors(), 0);
    }
}
