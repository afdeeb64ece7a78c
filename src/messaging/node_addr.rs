use std::fmt::Debug;
use std::fmt::Formatter;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a peer as far as liveness is concerned: the only thing the liveness core
///  requires is value equality. Addresses are cloned into monitors and senders, and they
///  must be movable to the driver task.
pub trait PeerAddr: Clone + Eq + Debug + Send + Sync + 'static {}
impl <T: Clone + Eq + Debug + Send + Sync + 'static> PeerAddr for T {}


/// A peer's network address plus an incarnation number that changes when the peer process
///  restarts.
///
/// Heartbeats from a restarted peer carry the new incarnation, so they do not match a monitor
///  that was set up for the previous incarnation: they show up as martians until the
///  application re-watches the peer. Seconds since epoch are a convenient incarnation in
///  typical environments; nothing depends on them being unguessable.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeAddr {
    pub incarnation: u32,
    pub socket_addr: SocketAddr,
}

impl Hash for NodeAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.incarnation.hash(state);
        self.socket_addr.hash(state);
    }
}

impl Debug for NodeAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}@{}]", self.socket_addr, self.incarnation)
    }
}

impl NodeAddr {
    pub fn new(socket_addr: SocketAddr, incarnation: u32) -> NodeAddr {
        NodeAddr {
            incarnation,
            socket_addr,
        }
    }

    /// same network address, next incarnation - i.e. the address a restarted peer would
    ///  heartbeat from
    pub fn next_incarnation(&self) -> NodeAddr {
        NodeAddr {
            incarnation: self.incarnation.wrapping_add(1),
            socket_addr: self.socket_addr,
        }
    }
}

impl From<SocketAddr> for NodeAddr {
    fn from(addr: SocketAddr) -> Self {
        // a clock before the epoch is broken beyond what liveness can fix - any fixed value
        //  is as good as any other then
        let incarnation = SystemTime::now().duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();

        NodeAddr {
            incarnation,
            socket_addr: addr,
        }
    }
}
