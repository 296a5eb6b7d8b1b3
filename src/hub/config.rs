//! Broadcast hub configuration

use std::time::Duration;

/// Default per-subscriber buffer capacity
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Default time a room without subscribers keeps its replay event
pub const DEFAULT_IDLE_ROOM_TIMEOUT: Duration = Duration::from_secs(60);

/// Default period of the room cleanup task
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Broadcast hub configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Replay the room's last event to every new subscriber
    pub auto_replay: bool,

    /// Events buffered per subscriber before new ones are dropped for it
    pub subscriber_capacity: usize,

    /// How long a room without subscribers is kept for replay
    pub idle_room_timeout: Duration,

    /// How often the cleanup task sweeps idle rooms
    pub cleanup_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            auto_replay: true,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            idle_room_timeout: DEFAULT_IDLE_ROOM_TIMEOUT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl HubConfig {
    /// Enable or disable replay-on-subscribe
    pub fn auto_replay(mut self, enabled: bool) -> Self {
        self.auto_replay = enabled;
        self
    }

    /// Disable replay-on-subscribe
    pub fn disable_replay(self) -> Self {
        self.auto_replay(false)
    }

    /// Set the per-subscriber buffer capacity (at least 1)
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set how long a room without subscribers keeps its replay event
    pub fn idle_room_timeout(mut self, timeout: Duration) -> Self {
        self.idle_room_timeout = timeout;
        self
    }

    /// Set the cleanup task period (at least 1ms)
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval.max(Duration::from_millis(1));
        self
    }
}
