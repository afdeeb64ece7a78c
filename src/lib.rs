pub mod clock;
pub mod liveness;
pub mod messaging;
pub mod scheduling;
pub mod test_util;
