//! Service configuration

use std::time::Duration;

use crate::hub::HubConfig;
use crate::limiter::LimiterConfig;
use crate::stats::StatsConfig;

/// Service configuration options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Admission control
    pub limiter: LimiterConfig,

    /// Room and delivery behavior
    pub hub: HubConfig,

    /// Stats aggregation
    pub stats: StatsConfig,
}

impl ServiceConfig {
    /// Set the per-client admission threshold
    pub fn rate_limit(mut self, threshold: u64) -> Self {
        self.limiter = self.limiter.threshold(threshold);
        self
    }

    /// Set how often a client's request count is logged
    pub fn log_interval(mut self, interval: u64) -> Self {
        self.limiter = self.limiter.log_interval(interval);
        self
    }

    /// Set the stats tick interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats = self.stats.interval(interval);
        self
    }

    /// Enable or disable replay-on-subscribe
    pub fn auto_replay(mut self, enabled: bool) -> Self {
        self.hub = self.hub.auto_replay(enabled);
        self
    }

    /// Set the per-subscriber buffer capacity
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.hub = self.hub.subscriber_capacity(capacity);
        self
    }

    /// Set how long a room without subscribers keeps its replay event
    pub fn idle_room_timeout(mut self, timeout: Duration) -> Self {
        self.hub = self.hub.idle_room_timeout(timeout);
        self
    }

    /// Set the room cleanup period
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.hub = self.hub.cleanup_interval(interval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();

        assert_eq!(config.limiter.threshold, 200);
        assert_eq!(config.limiter.log_interval, 50);
        assert_eq!(config.stats.interval, Duration::from_secs(1));
        assert!(config.hub.auto_replay);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServiceConfig::default()
            .rate_limit(10)
            .log_interval(5)
            .stats_interval(Duration::from_millis(250))
            .auto_replay(false)
            .subscriber_capacity(8)
            .idle_room_timeout(Duration::from_secs(30))
            .cleanup_interval(Duration::from_secs(2));

        assert_eq!(config.limiter.threshold, 10);
        assert_eq!(config.limiter.log_interval, 5);
        assert_eq!(config.stats.interval, Duration::from_millis(250));
        assert!(!config.hub.auto_replay);
        assert_eq!(config.hub.subscriber_capacity, 8);
        assert_eq!(config.hub.idle_room_timeout, Duration::from_secs(30));
        assert_eq!(config.hub.cleanup_interval, Duration::from_secs(2));
    }
}
