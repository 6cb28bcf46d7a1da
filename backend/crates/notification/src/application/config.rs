//! Event bus configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Broadcast buffer per subscriber. A connection that falls further
    /// behind than this gets a `lagged` frame.
    pub channel_capacity: usize,
    /// Events kept for `?since=` resumption
    pub replay_capacity: usize,
    pub ping_interval: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            replay_capacity: 1024,
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl EventBusConfig {
    pub fn development() -> Self {
        Self {
            channel_capacity: 64,
            replay_capacity: 256,
            ..Default::default()
        }
    }
}
