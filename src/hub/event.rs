//! Room keys and broadcast events
//!
//! Events carry already-encoded payloads. `Bytes` is reference counted, so
//! cloning an event once per subscriber never copies the payload.

use std::borrow::Borrow;

use bytes::Bytes;

/// Unique identifier for a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new room key
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Room name as given by the client
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoomId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of broadcast event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Chat message from a publisher
    Message,
    /// Periodic server statistics
    Stats,
}

impl EventKind {
    /// Name used by transports to label the event
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Stats => "stats",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Kind of event
    pub kind: EventKind,
    /// Encoded payload (zero-copy via reference counting)
    pub payload: Bytes,
}

impl Event {
    /// Create an event of any kind
    pub fn new(kind: EventKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Create a chat message event
    pub fn message(payload: impl Into<Bytes>) -> Self {
        Self::new(EventKind::Message, payload)
    }

    /// Create a stats event
    pub fn stats(payload: impl Into<Bytes>) -> Self {
        Self::new(EventKind::Stats, payload)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_room_id_lookup_by_str() {
        let mut rooms = HashMap::new();
        rooms.insert(RoomId::new("hn"), 1);

        assert_eq!(rooms.get("hn"), Some(&1));
        assert_eq!(RoomId::from("hn").to_string(), "hn");
    }

    #[test]
    fn test_event_constructors() {
        let event = Event::message(&b"hello"[..]);
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.payload, Bytes::from_static(b"hello"));

        let event = Event::stats(Bytes::from_static(b"{}"));
        assert_eq!(event.kind.as_str(), "stats");
    }
}
