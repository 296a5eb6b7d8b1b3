//! Per-room state
//!
//! A room owns one bounded sender per subscriber and the single-slot replay
//! cache. Handoff uses `try_send`, so a stalled subscriber only ever costs
//! its own events: when its buffer is full the newest event is dropped for
//! that subscriber and counted. A subscriber whose receiver was dropped
//! without unsubscribing is pruned on the next send.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::event::Event;
use super::subscription::SubscriberId;

/// Result of handing one event to a room's subscribers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that accepted the event
    pub delivered: usize,
    /// Subscribers whose buffer was full
    pub dropped: usize,
    /// Subscribers whose receiver was gone; they have been removed
    pub closed: usize,
}

/// State of a single room
pub struct Room {
    subscribers: HashMap<SubscriberId, mpsc::Sender<Event>>,

    /// Most recently published event, replayed to new subscribers
    last_event: Option<Event>,

    /// Events dropped on full subscriber buffers since the room was created
    dropped_events: u64,

    created_at: Instant,

    /// Last subscribe, unsubscribe or publish
    last_active: Instant,
}

impl Room {
    pub(super) fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            last_event: None,
            dropped_events: 0,
            created_at: Instant::now(),
            last_active: Instant::now(),
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Event that would be replayed to a new subscriber
    pub fn last_event(&self) -> Option<&Event> {
        self.last_event.as_ref()
    }

    pub(super) fn add(&mut self, id: SubscriberId, tx: mpsc::Sender<Event>) {
        self.subscribers.insert(id, tx);
        self.last_active = Instant::now();
    }

    /// Returns false if the subscriber was not registered
    pub(super) fn remove(&mut self, id: SubscriberId) -> bool {
        self.last_active = Instant::now();
        self.subscribers.remove(&id).is_some()
    }

    /// Whether the room can be dropped from the hub
    ///
    /// Rooms without subscribers go as soon as they hold nothing to replay;
    /// replay-only rooms go once they have been idle for `idle_timeout`.
    pub(super) fn is_expired(&self, idle_timeout: Duration) -> bool {
        if !self.subscribers.is_empty() {
            return false;
        }
        self.last_event.is_none() || self.last_active.elapsed() > idle_timeout
    }

    /// Hand the cached last event to a single subscriber
    pub(super) fn replay_to(&mut self, id: SubscriberId) -> Delivery {
        let mut delivery = Delivery::default();
        let (Some(event), Some(tx)) = (self.last_event.as_ref(), self.subscribers.get(&id))
        else {
            return delivery;
        };

        match tx.try_send(event.clone()) {
            Ok(()) => delivery.delivered += 1,
            Err(TrySendError::Full(_)) => delivery.dropped += 1,
            Err(TrySendError::Closed(_)) => delivery.closed += 1,
        }
        if delivery.closed > 0 {
            self.subscribers.remove(&id);
        }
        self.dropped_events += delivery.dropped as u64;
        delivery
    }

    /// Send an event to every current subscriber and cache it for replay
    ///
    /// Subscribers whose receiver is closed are removed and reported in
    /// `Delivery::closed`.
    pub(super) fn send(&mut self, event: Event, cache: bool) -> Delivery {
        let mut delivery = Delivery::default();

        self.subscribers
            .retain(|_, tx| match tx.try_send(event.clone()) {
                Ok(()) => {
                    delivery.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    delivery.closed += 1;
                    false
                }
            });
        self.dropped_events += delivery.dropped as u64;
        self.last_active = Instant::now();

        if cache {
            self.last_event = Some(event);
        }

        delivery
    }

    /// Snapshot of the room's counters
    pub fn stats(&self) -> RoomStats {
        RoomStats {
            subscriber_count: self.subscriber_count(),
            has_last_event: self.last_event.is_some(),
            dropped_events: self.dropped_events,
            age: self.created_at.elapsed(),
        }
    }
}

/// Statistics for a room
#[derive(Debug, Clone)]
pub struct RoomStats {
    /// Number of registered subscribers
    pub subscriber_count: usize,
    /// Whether a replay event is cached
    pub has_last_event: bool,
    /// Events dropped on full subscriber buffers
    pub dropped_events: u64,
    /// Time since the room was created
    pub age: Duration,
}
