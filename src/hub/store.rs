//! Broadcast hub implementation
//!
//! The central hub that owns every room and fans published events out to
//! the room's subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::counter::{Counters, CONNECTED, DISCONNECTED, OUTBOUND};

use super::config::HubConfig;
use super::event::{Event, EventKind, RoomId};
use super::room::{Delivery, Room, RoomStats};
use super::subscription::{SubscriberId, Subscription};

/// Central hub for all rooms
///
/// The room map is behind a `RwLock`; structural changes (creating and
/// removing rooms, registering and removing subscribers) take the write
/// lock, while publishing only needs the read lock plus the room's own lock.
/// Locks are always taken map first, room second.
///
/// Rooms left without subscribers are dropped by [`cleanup`](Self::cleanup)
/// once they hold nothing to replay or have sat idle past
/// `HubConfig::idle_room_timeout`.
pub struct BroadcastHub {
    /// Map of room key to room state
    rooms: RwLock<HashMap<RoomId, Arc<RwLock<Room>>>>,

    /// Shared traffic and subscriber counters
    counters: Counters,

    next_subscriber_id: AtomicU64,

    config: HubConfig,
}

impl BroadcastHub {
    /// Create a new hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a new hub with custom configuration and private counters
    pub fn with_config(config: HubConfig) -> Self {
        Self::with_counters(config, Counters::new())
    }

    /// Create a new hub reporting into shared counters
    pub fn with_counters(config: HubConfig, counters: Counters) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            counters,
            next_subscriber_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the counters this hub reports into
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Subscribe to a room
    ///
    /// Creates the room if needed. With replay enabled, the room's last
    /// event is handed to the new subscriber before any later publish can
    /// reach it.
    pub async fn subscribe(&self, key: &RoomId) -> Subscription {
        let id = SubscriberId::new(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.subscriber_capacity.max(1));

        let mut rooms = self.rooms.write().await;
        let room_arc = match rooms.get(key) {
            Some(room) => Arc::clone(room),
            None => {
                let room = Arc::new(RwLock::new(Room::new()));
                rooms.insert(key.clone(), Arc::clone(&room));
                tracing::info!(room = %key, "Room created");
                room
            }
        };

        let mut room = room_arc.write().await;
        room.add(id, tx);
        self.counters.users.add(CONNECTED, 1);

        let replayed = if self.config.auto_replay {
            let delivery = room.replay_to(id);
            self.record(room.last_event().map(|e| e.kind), &delivery);
            delivery.delivered > 0
        } else {
            false
        };

        tracing::debug!(
            room = %key,
            subscriber = %id,
            subscribers = room.subscriber_count(),
            replayed = replayed,
            "Subscriber added"
        );

        Subscription::new(id, key.clone(), rx)
    }

    /// Unsubscribe from a room
    ///
    /// Safe to call more than once and for unknown rooms. When the last
    /// subscriber leaves, the room is removed together with its replay
    /// cache. Returns whether a subscriber was actually removed.
    pub async fn unsubscribe(&self, key: &RoomId, id: SubscriberId) -> bool {
        let mut rooms = self.rooms.write().await;

        let Some(room_arc) = rooms.get(key).cloned() else {
            return false;
        };

        let mut room = room_arc.write().await;
        if !room.remove(id) {
            return false;
        }
        self.counters.users.add(DISCONNECTED, 1);

        let remaining = room.subscriber_count();
        tracing::debug!(
            room = %key,
            subscriber = %id,
            subscribers = remaining,
            "Subscriber removed"
        );

        if remaining == 0 {
            drop(room);
            rooms.remove(key);
            tracing::info!(room = %key, "Room removed");
        }

        true
    }

    /// Publish an event to every current subscriber of a room
    ///
    /// Publishing to a room without subscribers only records the event for
    /// replay (and does nothing when replay is disabled). Such replay-only
    /// rooms are reclaimed by [`cleanup`](Self::cleanup) once idle. Returns
    /// the number of subscribers that accepted the event.
    pub async fn publish(&self, key: &RoomId, event: Event) -> usize {
        let cache = self.config.auto_replay;

        {
            let rooms = self.rooms.read().await;
            if let Some(room_arc) = rooms.get(key) {
                let mut room = room_arc.write().await;
                return self.deliver(key, &mut room, event, cache);
            }
        }

        if !cache {
            return 0;
        }

        // Room is absent: create it so the event can be replayed later
        let mut rooms = self.rooms.write().await;
        let room_arc = Arc::clone(
            rooms
                .entry(key.clone())
                .or_insert_with(|| Arc::new(RwLock::new(Room::new()))),
        );
        let mut room = room_arc.write().await;
        self.deliver(key, &mut room, event, cache)
    }

    /// Publish an event to every room that currently has subscribers
    ///
    /// Rooms are never created here, and rooms without subscribers are
    /// skipped, so a room emptied while the pass runs keeps no trace of the
    /// event. The map read lock is held for the whole pass. Returns the
    /// number of rooms reached.
    pub async fn broadcast_active(&self, event: Event) -> usize {
        let cache = self.config.auto_replay;
        let rooms = self.rooms.read().await;
        let mut reached = 0;

        for (key, room_arc) in rooms.iter() {
            let mut room = room_arc.write().await;
            if room.subscriber_count() == 0 {
                continue;
            }
            self.deliver(key, &mut room, event.clone(), cache);
            reached += 1;
        }

        reached
    }

    fn deliver(&self, key: &RoomId, room: &mut Room, event: Event, cache: bool) -> usize {
        let kind = event.kind;
        let delivery = room.send(event, cache);
        self.record(Some(kind), &delivery);

        if delivery.dropped > 0 {
            tracing::debug!(
                room = %key,
                dropped = delivery.dropped,
                "Subscriber buffers full, event dropped"
            );
        }

        if delivery.closed > 0 {
            tracing::debug!(
                room = %key,
                closed = delivery.closed,
                subscribers = room.subscriber_count(),
                "Closed subscribers pruned"
            );
        }

        tracing::trace!(
            room = %key,
            kind = %kind,
            delivered = delivery.delivered,
            "Event published"
        );

        delivery.delivered
    }

    fn record(&self, kind: Option<EventKind>, delivery: &Delivery) {
        if kind == Some(EventKind::Message) && delivery.delivered > 0 {
            self.counters
                .messages
                .add(OUTBOUND, delivery.delivered as i64);
        }
        if delivery.closed > 0 {
            self.counters
                .users
                .add(DISCONNECTED, delivery.closed as i64);
        }
    }

    /// Run cleanup once
    ///
    /// Removes rooms that have no subscribers and either hold no replay
    /// event or have been idle longer than `idle_room_timeout`. Rooms whose
    /// lock is held elsewhere are skipped until the next pass.
    pub async fn cleanup(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        let timeout = self.config.idle_room_timeout;

        let keys_to_remove: Vec<RoomId> = rooms
            .iter()
            .filter_map(|(key, room_arc)| match room_arc.try_read() {
                Ok(room) if room.is_expired(timeout) => Some(key.clone()),
                _ => None,
            })
            .collect();

        for key in &keys_to_remove {
            rooms.remove(key);
            tracing::info!(room = %key, "Room removed by cleanup");
        }

        keys_to_remove.len()
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        let interval = hub.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                hub.cleanup().await;
            }
        })
    }

    /// Keys of every room with at least one subscriber
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        let rooms = self.rooms.read().await;
        let mut active = Vec::with_capacity(rooms.len());

        for (key, room_arc) in rooms.iter() {
            if room_arc.read().await.subscriber_count() > 0 {
                active.push(key.clone());
            }
        }

        active
    }

    /// Get total number of rooms, including rooms that only hold a replay event
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of subscribers registered on a room
    pub async fn subscriber_count(&self, key: &RoomId) -> usize {
        let rooms = self.rooms.read().await;

        match rooms.get(key) {
            Some(room_arc) => room_arc.read().await.subscriber_count(),
            None => 0,
        }
    }

    /// Get room statistics
    pub async fn room_stats(&self, key: &RoomId) -> Option<RoomStats> {
        let rooms = self.rooms.read().await;

        match rooms.get(key) {
            Some(room_arc) => Some(room_arc.read().await.stats()),
            None => None,
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
