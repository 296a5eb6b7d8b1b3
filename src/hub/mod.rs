//! Multi-room broadcast hub
//!
//! The hub owns every active room and fans published events out to the
//! room's subscribers. Each subscriber gets its own bounded
//! `tokio::sync::mpsc` channel, so delivery is a non-blocking handoff and a
//! stalled client never holds up the rest of the room.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<BroadcastHub>
//!                     ┌─────────────────────────┐
//!                     │ rooms: HashMap<RoomId,  │
//!                     │   Room {                │
//!                     │     subscribers: {id →  │
//!                     │       mpsc::Sender},    │
//!                     │     last_event,         │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [Subscription]          [Subscription]
//!    hub.publish()          sub.recv()              sub.recv()
//!         │                       │                       │
//!         └──► try_send() per subscriber ──► transport adapter
//! ```
//!
//! # Room lifecycle
//!
//! A room is created by the first subscribe (or by a publish, so the event
//! can be replayed) and removed as soon as its last subscriber leaves.
//! Rooms emptied any other way (a replay-only room, or subscribers pruned
//! after dropping their receiver) are swept by `BroadcastHub::cleanup`.

pub mod config;
pub mod event;
pub mod room;
pub mod store;
pub mod subscription;

pub use config::HubConfig;
pub use event::{Event, EventKind, RoomId};
pub use room::{Delivery, RoomStats};
pub use store::BroadcastHub;
pub use subscription::{SubscriberId, Subscription};
