use std::time::Duration;

use tokio::sync::broadcast;
use tracing::trace;

use crate::liveness::heartbeat_monitor::IncomingHeartbeatMonitor;
use crate::messaging::node_addr::PeerAddr;

pub type DeadHook<A> = Box<dyn Fn(&IncomingHeartbeatMonitor<A>) + Send + Sync>;
pub type WarnHook<A> = Box<dyn Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync>;
pub type ComeAliveHook<A> = Box<dyn Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync>;
pub type MartianHook<A> = Box<dyn Fn(&A) + Send + Sync>;

/// The four independent callback slots through which liveness changes become visible. Setting
///  a slot replaces its previous callback; an empty slot swallows the event.
///
/// Callbacks run synchronously inside the liveness operation that triggered them and get a
///  borrowed view of the monitor, valid for the duration of the call.
pub struct LivenessHooks<A: PeerAddr> {
    on_dead: Option<DeadHook<A>>,
    on_warn: Option<WarnHook<A>>,
    on_come_alive: Option<ComeAliveHook<A>>,
    on_martian: Option<MartianHook<A>>,
}

impl <A: PeerAddr> Default for LivenessHooks<A> {
    fn default() -> Self {
        LivenessHooks {
            on_dead: None,
            on_warn: None,
            on_come_alive: None,
            on_martian: None,
        }
    }
}

impl <A: PeerAddr> LivenessHooks<A> {
    pub fn set_dead_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>) + Send + Sync + 'static) {
        self.on_dead = Some(Box::new(hook));
    }

    pub fn set_warn_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync + 'static) {
        self.on_warn = Some(Box::new(hook));
    }

    pub fn set_come_alive_hook(&mut self, hook: impl Fn(&IncomingHeartbeatMonitor<A>, Duration) + Send + Sync + 'static) {
        self.on_come_alive = Some(Box::new(hook));
    }

    pub fn set_martian_hook(&mut self, hook: impl Fn(&A) + Send + Sync + 'static) {
        self.on_martian = Some(Box::new(hook));
    }

    pub fn fire_dead(&self, monitor: &IncomingHeartbeatMonitor<A>) {
        if let Some(hook) = &self.on_dead {
            hook(monitor);
        }
    }

    pub fn fire_warn(&self, monitor: &IncomingHeartbeatMonitor<A>, how_late: Duration) {
        if let Some(hook) = &self.on_warn {
            hook(monitor, how_late);
        }
    }

    pub fn fire_come_alive(&self, monitor: &IncomingHeartbeatMonitor<A>, how_late: Duration) {
        if let Some(hook) = &self.on_come_alive {
            hook(monitor, how_late);
        }
    }

    pub fn fire_martian(&self, addr: &A) {
        if let Some(hook) = &self.on_martian {
            hook(addr);
        }
    }
}


/// Owned counterpart of a hook invocation, for consumers that are decoupled from the liveness
///  context (e.g. subscribers of the driver's event channel)
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LivenessEvent<A: PeerAddr> {
    PeerDead(PeerDeadData<A>),
    PeerLate(PeerLateData<A>),
    PeerCameAlive(PeerCameAliveData<A>),
    Martian(MartianData<A>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerDeadData<A: PeerAddr> {
    pub addr: A,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerLateData<A: PeerAddr> {
    pub addr: A,
    pub how_late: Duration,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerCameAliveData<A: PeerAddr> {
    pub addr: A,
    pub how_late: Duration,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MartianData<A: PeerAddr> {
    pub addr: A,
}

impl <A: PeerAddr> LivenessEvent<A> {
    pub fn addr(&self) -> &A {
        match self {
            LivenessEvent::PeerDead(data) => &data.addr,
            LivenessEvent::PeerLate(data) => &data.addr,
            LivenessEvent::PeerCameAlive(data) => &data.addr,
            LivenessEvent::Martian(data) => &data.addr,
        }
    }
}

/// Routes all four hooks of a [LivenessHooks] into one event sink.
pub fn route_hooks_to<A: PeerAddr>(hooks: &mut LivenessHooks<A>, sink: impl Fn(LivenessEvent<A>) + Clone + Send + Sync + 'static) {
    let s = sink.clone();
    hooks.set_dead_hook(move |m| s(LivenessEvent::PeerDead(PeerDeadData { addr: m.peer_addr().clone() })));
    let s = sink.clone();
    hooks.set_warn_hook(move |m, how_late| s(LivenessEvent::PeerLate(PeerLateData { addr: m.peer_addr().clone(), how_late })));
    let s = sink.clone();
    hooks.set_come_alive_hook(move |m, how_late| s(LivenessEvent::PeerCameAlive(PeerCameAliveData { addr: m.peer_addr().clone(), how_late })));
    hooks.set_martian_hook(move |addr| sink(LivenessEvent::Martian(MartianData { addr: addr.clone() })));
}


pub struct LivenessEventNotifier<A: PeerAddr> {
    sender: broadcast::Sender<LivenessEvent<A>>,
}
impl <A: PeerAddr> Clone for LivenessEventNotifier<A> {
    fn clone(&self) -> Self {
        LivenessEventNotifier {
            sender: self.sender.clone(),
        }
    }
}
impl <A: PeerAddr> LivenessEventNotifier<A> {
    pub fn new(capacity: usize) -> LivenessEventNotifier<A> {
        let (sender, _) = broadcast::channel(capacity.max(1));

        LivenessEventNotifier {
            sender
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LivenessEvent<A>> {
        self.sender.subscribe()
    }

    pub fn send_event(&self, event: LivenessEvent<A>) {
        trace!("event: {:?}", event);
        // no subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn install_into(&self, hooks: &mut LivenessHooks<A>) {
        let notifier = self.clone();
        route_hooks_to(hooks, move |evt| notifier.send_event(evt));
    }
}
