//! Rate limiter configuration

/// Default admission threshold per client
pub const DEFAULT_THRESHOLD: u64 = 200;

/// Default sampling interval for the count log line
pub const DEFAULT_LOG_INTERVAL: u64 = 50;

/// Rate limiter configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Requests are admitted while the client's count stays below this value
    pub threshold: u64,

    /// Log the client's count every this many requests (0 = never)
    pub log_interval: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            log_interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

impl LimiterConfig {
    /// Set the admission threshold
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the log sampling interval
    pub fn log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval;
        self
    }
}
