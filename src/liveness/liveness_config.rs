use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// expected heartbeat interval for peers that are watched without an explicit interval
    pub default_expected_interval: Duration,
    /// the warn interval is the expected interval divided by this; must be > 0
    pub warn_interval_divisor: u32,

    /// non-urgent timeout sweeps closer together than this are skipped
    pub sweep_min_interval: Duration,
    /// how often the driver triggers a (non-urgent) timeout sweep
    pub sweep_tick_interval: Duration,

    /// lower bound for the period of outgoing heartbeats
    pub min_send_interval: Duration,

    pub command_channel_capacity: usize,
    pub event_channel_capacity: usize,
}

impl LivenessConfig {
    pub fn new() -> LivenessConfig {
        LivenessConfig {
            default_expected_interval: Duration::from_secs(60),
            warn_interval_divisor: 4,
            sweep_min_interval: Duration::from_secs(1),
            sweep_tick_interval: Duration::from_millis(250),
            min_send_interval: Duration::from_secs(1),
            command_channel_capacity: 1024,
            event_channel_capacity: 128,
        }
    }

    pub fn warn_interval(&self, expected_interval: Duration) -> Duration {
        expected_interval / self.warn_interval_divisor.max(1)
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self::new()
    }
}
