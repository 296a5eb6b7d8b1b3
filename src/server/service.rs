//! Broadcast service
//!
//! Composition root: owns the counters, the rate limiter, the hub and the
//! stats handle, and exposes the operations a transport adapter maps its
//! requests onto.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::chat::ChatPost;
use crate::counter::{Counters, INBOUND};
use crate::error::Result;
use crate::hub::{BroadcastHub, Event, EventKind, RoomId, SubscriberId, Subscription};
use crate::limiter::{Admission, RateLimiter};
use crate::server::config::ServiceConfig;
use crate::stats::{MemoryProbe, ProcessProbe, StatsAggregator, StatsHandle, StatsSnapshot};

/// Broadcast service
pub struct Broadcaster {
    config: ServiceConfig,
    counters: Counters,
    limiter: RateLimiter,
    hub: Arc<BroadcastHub>,
    stats: StatsHandle,
    probe: Arc<dyn MemoryProbe>,
}

impl Broadcaster {
    /// Create a new service with the given configuration
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_probe(config, Arc::new(ProcessProbe::new()))
    }

    /// Create a new service sampling memory from a custom source
    pub fn with_probe(config: ServiceConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        let counters = Counters::new();
        let limiter =
            RateLimiter::with_store(Arc::clone(&counters.rates), config.limiter.clone());
        let hub = Arc::new(BroadcastHub::with_counters(
            config.hub.clone(),
            counters.clone(),
        ));

        Self {
            config,
            counters,
            limiter,
            hub,
            stats: StatsHandle::new(),
            probe,
        }
    }

    /// Get the service configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get a reference to the broadcast hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get the shared counters
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Count a request from `client` and decide whether to admit it
    pub fn admit(&self, client: &str) -> Admission {
        self.limiter.admit(client)
    }

    /// Admission as a `Result`, for `?`-style request handlers
    pub fn check(&self, client: &str) -> Result<u64> {
        self.limiter.check(client)
    }

    /// Register a new subscriber on a room
    pub async fn subscribe(&self, room: &RoomId) -> Subscription {
        self.hub.subscribe(room).await
    }

    /// Remove a subscriber; a no-op if it is already gone
    pub async fn unsubscribe(&self, room: &RoomId, id: SubscriberId) {
        self.hub.unsubscribe(room, id).await;
    }

    /// Publish an already-encoded payload to a room
    ///
    /// Chat messages count towards the inbound traffic counter.
    pub async fn publish(
        &self,
        room: &RoomId,
        kind: EventKind,
        payload: impl Into<Bytes>,
    ) -> usize {
        if kind == EventKind::Message {
            self.counters.messages.add(INBOUND, 1);
        }
        self.hub.publish(room, Event::new(kind, payload)).await
    }

    /// Admit, validate, encode and publish a chat post
    ///
    /// Nothing is published if any step fails.
    pub async fn post_message(
        &self,
        client: &str,
        room: &RoomId,
        nick: &str,
        message: &str,
    ) -> Result<ChatPost> {
        self.check(client)?;

        let post = ChatPost::new(nick, message)?;
        let payload = post.encode()?;

        let delivered = self.publish(room, EventKind::Message, payload).await;
        tracing::debug!(
            room = %room,
            client = client,
            delivered = delivered,
            "Chat message posted"
        );

        Ok(post)
    }

    /// Latest stats snapshot, or an empty one before the first tick
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.get()
    }

    /// Build an aggregator wired to this service's hub, counters and stats
    pub fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::with_probe(
            Arc::clone(&self.hub),
            self.counters.clone(),
            self.config.stats.clone(),
            Arc::clone(&self.probe),
        )
        .with_handle(self.stats.clone())
    }

    /// Spawn the background stats task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_stats_task(&self) -> JoinHandle<()> {
        self.aggregator().spawn()
    }

    /// Spawn the background task that drops idle rooms
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(&self) -> JoinHandle<()> {
        self.hub.spawn_cleanup_task()
    }

    /// Run the stats and cleanup tasks until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let stats_handle = self.spawn_stats_task();
        let cleanup_handle = self.spawn_cleanup_task();
        tracing::info!(
            rate_limit = self.config.limiter.threshold,
            stats_interval_ms = self.config.stats.interval.as_millis() as u64,
            cleanup_interval_ms = self.config.hub.cleanup_interval.as_millis() as u64,
            auto_replay = self.config.hub.auto_replay,
            "Broadcaster running"
        );

        shutdown.await;
        tracing::info!("Shutdown signal received");

        // Stop background tasks on shutdown
        stats_handle.abort();
        cleanup_handle.abort();
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}
