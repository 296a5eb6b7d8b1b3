//! Named counter store
//!
//! Counters live behind a `RwLock<HashMap<String, AtomicI64>>`. Increments of
//! an existing counter only need the read lock plus a `fetch_add`, so callers
//! hammering different (or the same) names never serialize on the map. The
//! write lock is taken to insert a new name and to reset, which makes reset
//! atomic with respect to every concurrent add.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Registry of named signed 64-bit counters
#[derive(Debug, Default)]
pub struct CounterStore {
    counters: RwLock<HashMap<String, AtomicI64>>,
}

impl CounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to `name` and return the resulting value
    ///
    /// The counter is created at zero on first use. Concurrent adds on the
    /// same name each observe a distinct result.
    pub fn add(&self, name: &str, delta: i64) -> i64 {
        {
            let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counter) = counters.get(name) {
                return counter.fetch_add(delta, Ordering::AcqRel) + delta;
            }
        }

        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        let counter = counters
            .entry(name.to_owned())
            .or_insert_with(|| AtomicI64::new(0));
        counter.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Current value of `name`, or 0 if it was never touched
    pub fn get(&self, name: &str) -> i64 {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        counters
            .get(name)
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Zero every tracked counter
    pub fn reset(&self) {
        let counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        for counter in counters.values() {
            counter.store(0, Ordering::Release);
        }
    }

    /// Read every counter and zero it in one critical section
    ///
    /// Unlike `get` followed by `reset`, no increment can land in between
    /// and be lost.
    pub fn drain(&self) -> HashMap<String, i64> {
        let counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        counters
            .iter()
            .map(|(name, counter)| (name.clone(), counter.swap(0, Ordering::AcqRel)))
            .collect()
    }

    /// Number of tracked names
    pub fn len(&self) -> usize {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no counter has been created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_add_and_get() {
        let store = CounterStore::new();

        assert_eq!(store.get("inbound"), 0);
        assert_eq!(store.add("inbound", 1), 1);
        assert_eq!(store.add("inbound", 4), 5);
        assert_eq!(store.add("inbound", -2), 3);
        assert_eq!(store.get("inbound"), 3);
        assert_eq!(store.get("outbound"), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reset_zeroes_all() {
        let store = CounterStore::new();
        store.add("a", 3);
        store.add("b", 7);

        store.reset();

        assert_eq!(store.get("a"), 0);
        assert_eq!(store.get("b"), 0);
        // Names stay tracked after a reset
        assert_eq!(store.len(), 2);
        assert_eq!(store.add("a", 1), 1);
    }

    #[test]
    fn test_drain_returns_values_and_zeroes() {
        let store = CounterStore::new();
        store.add("inbound", 12);
        store.add("outbound", 30);

        let drained = store.drain();

        assert_eq!(drained.get("inbound"), Some(&12));
        assert_eq!(drained.get("outbound"), Some(&30));
        assert_eq!(store.get("inbound"), 0);
        assert_eq!(store.get("outbound"), 0);
    }

    #[test]
    fn test_concurrent_adds_are_atomic() {
        let store = Arc::new(CounterStore::new());
        let threads = 8;
        let per_thread = 1_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| store.add("hits", 1))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "value {} observed twice", value);
            }
        }

        assert_eq!(store.get("hits"), threads * per_thread);
        assert_eq!(seen.len() as i64, threads * per_thread);
    }
}
