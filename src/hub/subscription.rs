//! Subscriber handles

use tokio::sync::mpsc;

use super::event::{Event, RoomId};

/// Identifier of one registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(super) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving side of a subscription, owned by the transport adapter
///
/// Events arrive in publish order. Once the subscriber is unsubscribed the
/// hub drops its sender, so `recv` drains whatever was already handed off
/// and then returns `None`.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    room: RoomId,
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    pub(super) fn new(id: SubscriberId, room: RoomId, rx: mpsc::Receiver<Event>) -> Self {
        Self { id, room, rx }
    }

    /// Identifier to pass back to `unsubscribe`
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Room this subscriber is registered with
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Take the next event if one is already buffered
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}
