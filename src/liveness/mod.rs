pub mod heartbeat_monitor;
pub mod heartbeat_sender;
pub mod liveness;
pub mod liveness_config;
pub mod liveness_driver;
pub mod liveness_events;
pub mod registry;
