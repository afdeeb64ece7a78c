#[cfg(test)] use mockall::automock;

use crate::messaging::node_addr::PeerAddr;

/// The message a heartbeat sender hands to its transport on every tick. The liveness core
///  does not look inside; it only builds one per tick and passes it through.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct HeartbeatMessage {
    /// per sender, starting at 1 for the first heartbeat
    pub sequence: u64,
}
impl HeartbeatMessage {
    pub fn new(sequence: u64) -> HeartbeatMessage {
        HeartbeatMessage {
            sequence,
        }
    }
}

/// Sending side of the network: delivers a heartbeat to a peer. Sending is fire-and-forget
///  from the liveness core's perspective; failures are the transport's business.
#[cfg_attr(test, automock)]
pub trait HeartbeatTransport<A: PeerAddr>: Send + Sync + 'static {
    fn send(&self, to: &A, msg: HeartbeatMessage);
}
