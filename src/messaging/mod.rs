pub mod heartbeat_message;
pub mod node_addr;
