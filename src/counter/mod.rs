//! Named counters shared by the rate limiter, the hub and the stats aggregator
//!
//! A single [`Counters`] set is created by the composition root and handed
//! to each component. It is split into three independent stores so the
//! aggregator can drain the per-interval message counters without touching
//! per-client admission counts or the connect/disconnect tallies.

pub mod store;

use std::sync::Arc;

pub use store::CounterStore;

/// Counter name for messages accepted from publishers
pub const INBOUND: &str = "inbound";
/// Counter name for events handed to subscribers
pub const OUTBOUND: &str = "outbound";
/// Counter name for subscribe calls
pub const CONNECTED: &str = "connected";
/// Counter name for effective unsubscribe calls
pub const DISCONNECTED: &str = "disconnected";

/// The process-wide counter namespaces
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Per-client admission counts, keyed by client identifier
    pub rates: Arc<CounterStore>,
    /// `inbound` / `outbound` message counts for the current interval
    pub messages: Arc<CounterStore>,
    /// `connected` / `disconnected` subscriber tallies
    pub users: Arc<CounterStore>,
}

impl Counters {
    /// Create a fresh, empty set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected subscribers, clamped at zero
    ///
    /// Disconnects can be momentarily over-counted when unsubscribe races
    /// a dropped connection, so the difference is floored.
    pub fn connected_users(&self) -> u64 {
        let connected = self.users.get(CONNECTED) - self.users.get(DISCONNECTED);
        connected.max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_users() {
        let counters = Counters::new();
        counters.users.add(CONNECTED, 3);
        counters.users.add(DISCONNECTED, 1);
        assert_eq!(counters.connected_users(), 2);
    }

    #[test]
    fn test_connected_users_clamped() {
        let counters = Counters::new();
        counters.users.add(CONNECTED, 1);
        counters.users.add(DISCONNECTED, 4);
        assert_eq!(counters.connected_users(), 0);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let counters = Counters::new();
        counters.rates.add("10.0.0.1", 5);
        counters.messages.add(INBOUND, 2);

        counters.messages.reset();

        assert_eq!(counters.messages.get(INBOUND), 0);
        assert_eq!(counters.rates.get("10.0.0.1"), 5);
    }
}
