//! Stats aggregator configuration

use std::time::Duration;

/// Stats aggregator configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Time between two ticks
    pub interval: Duration,

    /// Publish each snapshot as a `stats` event on every active room
    pub broadcast: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            broadcast: true,
        }
    }
}

impl StatsConfig {
    /// Set the tick interval (at least one millisecond)
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Keep snapshots internal instead of publishing them to rooms
    pub fn disable_broadcast(mut self) -> Self {
        self.broadcast = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatsConfig::default();

        assert_eq!(config.interval, Duration::from_secs(1));
        assert!(config.broadcast);
    }

    #[test]
    fn test_builder_interval_floor() {
        let config = StatsConfig::default().interval(Duration::ZERO);

        assert_eq!(config.interval, Duration::from_millis(1));
    }
}
