//! Background stats aggregation
//!
//! Once per interval the aggregator samples memory, drains the per-interval
//! message counters, replaces the shared snapshot and publishes it as a
//! `stats` event on every room that has subscribers. Broadcasting goes
//! through `BroadcastHub::broadcast_active`, which never creates a room.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::counter::{Counters, INBOUND, OUTBOUND};
use crate::hub::{BroadcastHub, Event};

use super::config::StatsConfig;
use super::memory::{MemoryProbe, MemorySample, ProcessProbe};
use super::snapshot::{StatsHandle, StatsSnapshot};

/// Periodic stats aggregator
pub struct StatsAggregator {
    hub: Arc<BroadcastHub>,
    counters: Counters,
    probe: Arc<dyn MemoryProbe>,
    latest: StatsHandle,

    /// Last successful memory sample, carried across ticks
    previous: MemorySample,

    config: StatsConfig,
}

impl StatsAggregator {
    /// Create an aggregator reading the current process
    pub fn new(hub: Arc<BroadcastHub>, counters: Counters, config: StatsConfig) -> Self {
        Self::with_probe(hub, counters, config, Arc::new(ProcessProbe::new()))
    }

    /// Create an aggregator with a custom memory source
    pub fn with_probe(
        hub: Arc<BroadcastHub>,
        counters: Counters,
        config: StatsConfig,
        probe: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            hub,
            counters,
            probe,
            latest: StatsHandle::new(),
            previous: MemorySample::default(),
            config,
        }
    }

    /// Publish snapshots into an existing handle instead of a private one
    pub fn with_handle(mut self, handle: StatsHandle) -> Self {
        self.latest = handle;
        self
    }

    /// Handle for reading the latest snapshot
    pub fn handle(&self) -> StatsHandle {
        self.latest.clone()
    }

    /// Latest snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.latest.get()
    }

    /// Run one aggregation step and return the new snapshot
    pub async fn tick(&mut self) -> StatsSnapshot {
        let sample = match self.probe.sample() {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(error = %e, "Memory sample failed, reusing previous values");
                self.previous
            }
        };

        // Read and zero in one step so no message lands between the two
        let messages = self.counters.messages.drain();
        let counter = |name: &str| messages.get(name).copied().unwrap_or(0).max(0) as u64;

        let snapshot = StatsSnapshot {
            timestamp: unix_now(),
            heap_in_use: sample.heap_in_use,
            stack_in_use: sample.stack_in_use,
            mallocs_delta: sample.mallocs.saturating_sub(self.previous.mallocs),
            frees_delta: sample.frees.saturating_sub(self.previous.frees),
            inbound_delta: counter(INBOUND),
            outbound_delta: counter(OUTBOUND),
            connected_count: self.counters.connected_users(),
        };
        self.previous = sample;

        self.latest.replace(snapshot);

        if self.config.broadcast {
            self.broadcast(&snapshot).await;
        }

        snapshot
    }

    async fn broadcast(&self, snapshot: &StatsSnapshot) {
        if snapshot.is_empty() {
            return;
        }

        let data = match snapshot.encode() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode stats snapshot");
                return;
            }
        };

        let rooms = self.hub.broadcast_active(Event::stats(data)).await;

        tracing::trace!(
            rooms = rooms,
            connected = snapshot.connected_count,
            "Stats published"
        );
    }

    /// Spawn the perpetual tick task
    ///
    /// The first tick fires one interval after spawning. Returns a handle
    /// that can be used to abort the task.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.interval;
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::counter::{CONNECTED, DISCONNECTED};
    use crate::hub::{EventKind, HubConfig, RoomId};

    /// Probe returning scripted samples, then errors
    struct ScriptedProbe {
        samples: Mutex<Vec<io::Result<MemorySample>>>,
    }

    impl ScriptedProbe {
        fn new(mut samples: Vec<io::Result<MemorySample>>) -> Arc<Self> {
            samples.reverse();
            Arc::new(Self {
                samples: Mutex::new(samples),
            })
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn sample(&self) -> io::Result<MemorySample> {
            self.samples
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::Other, "exhausted")))
        }
    }

    fn sample(mallocs: u64, frees: u64) -> io::Result<MemorySample> {
        Ok(MemorySample {
            heap_in_use: 1024,
            stack_in_use: 64,
            mallocs,
            frees,
        })
    }

    fn aggregator(probe: Arc<ScriptedProbe>) -> (StatsAggregator, Arc<BroadcastHub>, Counters) {
        let counters = Counters::new();
        let hub = Arc::new(BroadcastHub::with_counters(
            HubConfig::default(),
            counters.clone(),
        ));
        let aggregator = StatsAggregator::with_probe(
            Arc::clone(&hub),
            counters.clone(),
            StatsConfig::default(),
            probe,
        );
        (aggregator, hub, counters)
    }

    #[tokio::test]
    async fn test_stats_empty_before_first_tick() {
        let (aggregator, _hub, _counters) = aggregator(ScriptedProbe::new(vec![]));
        assert!(aggregator.stats().is_empty());
    }

    #[tokio::test]
    async fn test_tick_computes_deltas() {
        let (mut aggregator, _hub, counters) =
            aggregator(ScriptedProbe::new(vec![sample(100, 40), sample(150, 90)]));

        let first = aggregator.tick().await;
        assert_eq!(first.mallocs_delta, 100);
        assert_eq!(first.frees_delta, 40);

        let second = aggregator.tick().await;
        assert_eq!(second.mallocs_delta, 50);
        assert_eq!(second.frees_delta, 50);
        assert_eq!(second.heap_in_use, 1024);
        assert_eq!(aggregator.stats(), second);
        assert_eq!(counters.messages.get(INBOUND), 0);
    }

    #[tokio::test]
    async fn test_tick_drains_message_counters() {
        let (mut aggregator, _hub, counters) =
            aggregator(ScriptedProbe::new(vec![sample(1, 1), sample(1, 1)]));

        counters.messages.add(INBOUND, 4);
        counters.messages.add(OUTBOUND, 9);

        let first = aggregator.tick().await;
        assert_eq!(first.inbound_delta, 4);
        assert_eq!(first.outbound_delta, 9);

        let second = aggregator.tick().await;
        assert_eq!(second.inbound_delta, 0);
        assert_eq!(second.outbound_delta, 0);
    }

    #[tokio::test]
    async fn test_failed_sample_reuses_previous() {
        let (mut aggregator, _hub, _counters) = aggregator(ScriptedProbe::new(vec![
            sample(10, 5),
            Err(io::Error::new(io::ErrorKind::Other, "unreadable")),
        ]));

        aggregator.tick().await;
        let snapshot = aggregator.tick().await;

        assert_eq!(snapshot.heap_in_use, 1024);
        assert_eq!(snapshot.mallocs_delta, 0);
        assert_eq!(snapshot.frees_delta, 0);
        assert!(snapshot.timestamp > 0);
    }

    #[tokio::test]
    async fn test_connected_count_clamped() {
        let (mut aggregator, _hub, counters) = aggregator(ScriptedProbe::new(vec![sample(1, 0)]));

        counters.users.add(CONNECTED, 1);
        counters.users.add(DISCONNECTED, 3);

        assert_eq!(aggregator.tick().await.connected_count, 0);
    }

    #[tokio::test]
    async fn test_tick_publishes_to_active_rooms() {
        let (mut aggregator, hub, _counters) = aggregator(ScriptedProbe::new(vec![sample(1, 0)]));

        let mut live = hub.subscribe(&RoomId::new("live")).await;
        let mut other = hub.subscribe(&RoomId::new("other")).await;

        let snapshot = aggregator.tick().await;
        assert_eq!(snapshot.connected_count, 2);

        for sub in [&mut live, &mut other] {
            let event = sub.recv().await.unwrap();
            assert_eq!(event.kind, EventKind::Stats);
            let decoded: StatsSnapshot = serde_json::from_slice(&event.payload).unwrap();
            assert_eq!(decoded, snapshot);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshot_fields_from_one_tick() {
        let (aggregator, hub, counters) = aggregator(ScriptedProbe::new(
            (1..=50).map(|n| sample(n * 10, n * 10)).collect(),
        ));
        let handle = aggregator.handle();
        let _sub = hub.subscribe(&RoomId::new("live")).await;
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut reads = 0u64;
                loop {
                    let snapshot = handle.get();
                    // Every tick writes inbound == connected, so a mixed
                    // snapshot would break the equality
                    assert_eq!(snapshot.inbound_delta, snapshot.connected_count);
                    reads += 1;
                    if done.load(Ordering::Acquire) {
                        break reads;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut aggregator = aggregator;
        for n in 1..=50i64 {
            counters.users.add(CONNECTED, 1);
            // One subscriber is already connected
            counters.messages.add(INBOUND, n + 1);
            let snapshot = aggregator.tick().await;
            assert_eq!(snapshot.inbound_delta, snapshot.connected_count);
            tokio::task::yield_now().await;
        }

        done.store(true, Ordering::Release);
        assert!(reader.await.unwrap() > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ticks_never_recreate_departed_rooms() {
        let counters = Counters::new();
        let hub = Arc::new(BroadcastHub::with_counters(
            HubConfig::default(),
            counters.clone(),
        ));
        let task = StatsAggregator::with_probe(
            Arc::clone(&hub),
            counters,
            StatsConfig::default().interval(Duration::from_millis(1)),
            ScriptedProbe::new(vec![]),
        )
        .spawn();

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    for i in 0..500 {
                        let key = RoomId::new(format!("room-{worker}-{i}"));
                        let sub = hub.subscribe(&key).await;
                        tokio::task::yield_now().await;
                        hub.unsubscribe(&key, sub.id()).await;
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.await.unwrap();
        }
        task.abort();

        assert_eq!(hub.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_spawned_task_ticks() {
        let counters = Counters::new();
        let hub = Arc::new(BroadcastHub::with_counters(
            HubConfig::default(),
            counters.clone(),
        ));
        let aggregator = StatsAggregator::new(
            Arc::clone(&hub),
            counters,
            StatsConfig::default().interval(Duration::from_millis(10)),
        );
        let handle = aggregator.handle();
        let mut sub = hub.subscribe(&RoomId::new("live")).await;

        let task = aggregator.spawn();
        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap()
            .unwrap();
        task.abort();

        assert_eq!(event.kind, EventKind::Stats);
        assert!(!handle.get().is_empty());
    }
}
