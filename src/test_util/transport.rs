use std::sync::Mutex;

use crate::messaging::heartbeat_message::{HeartbeatMessage, HeartbeatTransport};
use crate::messaging::node_addr::PeerAddr;

/// [HeartbeatTransport] that records all heartbeats instead of sending them
#[derive(Debug)]
pub struct TrackingHeartbeatTransport<A: PeerAddr> {
    tracker: Mutex<Vec<(A, HeartbeatMessage)>>,
}
impl <A: PeerAddr> Default for TrackingHeartbeatTransport<A> {
    fn default() -> Self {
        TrackingHeartbeatTransport {
            tracker: Default::default(),
        }
    }
}
impl <A: PeerAddr> TrackingHeartbeatTransport<A> {
    pub fn new() -> Self {
        Default::default()
    }

    /// returns sent messages, clearing the internal buffer
    pub fn sent_messages(&self) -> Vec<(A, HeartbeatMessage)> {
        let mut lock = self.tracker.lock().expect("lock poisoned");
        std::mem::take(&mut *lock)
    }
}

impl <A: PeerAddr> HeartbeatTransport<A> for TrackingHeartbeatTransport<A> {
    fn send(&self, to: &A, msg: HeartbeatMessage) {
        self.tracker.lock().expect("lock poisoned")
            .push((to.clone(), msg));
    }
}
