//! This module contains utilities that are useful for testing code based on liveness
//!  functionality: deterministic clock and scheduler, a recording transport, and an event
//!  recorder. They are used for testing liveness itself, and they are also exported for
//!  application testing, which is why they are part of the crate's regular
//!  (non-#[cfg(test)]) code.

pub mod clock;
pub mod event;
pub mod node;
pub mod scheduler;
pub mod transport;
