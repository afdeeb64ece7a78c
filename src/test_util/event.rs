use std::sync::{Arc, Mutex};

use crate::liveness::liveness_events::{route_hooks_to, LivenessEvent, LivenessHooks};
use crate::messaging::node_addr::PeerAddr;

/// Replaces all hooks with callbacks that record the corresponding events, in invocation order.
pub fn record_events<A: PeerAddr>(hooks: &mut LivenessHooks<A>) -> Arc<Mutex<Vec<LivenessEvent<A>>>> {
    let events = Arc::new(Mutex::new(Vec::new()));

    let e = events.clone();
    route_hooks_to(hooks, move |evt| e.lock().expect("lock poisoned").push(evt));
    events
}
