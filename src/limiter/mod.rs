//! Per-client admission control
//!
//! Every request from a client bumps that client's counter; requests are
//! admitted while the count stays below the threshold. There is no decay:
//! once a client crosses the threshold it stays rejected until the rate
//! counters are reset from outside.

pub mod config;

use std::sync::Arc;

use crate::counter::CounterStore;
use crate::error::{Error, Result};

pub use config::LimiterConfig;

/// Outcome of a single admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The client's request count including this request
    pub count: u64,
}

/// Accept-until-threshold rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    counters: Arc<CounterStore>,
    config: LimiterConfig,
}

impl RateLimiter {
    /// Create a limiter backed by its own counter store
    pub fn new(config: LimiterConfig) -> Self {
        Self::with_store(Arc::new(CounterStore::new()), config)
    }

    /// Create a limiter on top of a shared counter store
    pub fn with_store(counters: Arc<CounterStore>, config: LimiterConfig) -> Self {
        Self { counters, config }
    }

    /// Get the limiter configuration
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Count one request from `client` and decide whether to admit it
    ///
    /// The increment and the read are one atomic step, so concurrent calls
    /// for the same client never observe the same count.
    pub fn admit(&self, client: &str) -> Admission {
        let count = self.counters.add(client, 1).max(0) as u64;
        let allowed = count < self.config.threshold;

        if self.config.log_interval > 0 && count % self.config.log_interval == 0 {
            tracing::info!(client = client, count = count, "Client request count");
        }

        if !allowed && self.config.threshold > 0 && count % self.config.threshold == 0 {
            tracing::warn!(client = client, count = count, "Client blocked");
        }

        Admission { allowed, count }
    }

    /// Same as [`admit`](Self::admit), as a `Result`
    pub fn check(&self, client: &str) -> Result<u64> {
        let admission = self.admit(client);
        if admission.allowed {
            Ok(admission.count)
        } else {
            Err(Error::RateLimitExceeded {
                client: client.to_owned(),
                count: admission.count,
            })
        }
    }

    /// Current count for `client` without counting a request
    pub fn count(&self, client: &str) -> u64 {
        self.counters.get(client).max(0) as u64
    }
}
