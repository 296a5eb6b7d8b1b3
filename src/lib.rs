//! roomcast: a multi-room broadcast core
//!
//! Clients subscribe to named rooms and receive a live stream of events;
//! other clients publish into a room and every current subscriber gets the
//! event. A per-client rate limiter sits in front of publishing, and a stats
//! aggregator samples memory and traffic counters on a fixed tick and pushes
//! each snapshot into every active room.
//!
//! The crate is transport-agnostic: a thin adapter maps its requests onto
//! [`Broadcaster`] and frames [`Event`]s onto whatever stream it serves.
//!
//! ```no_run
//! use roomcast::{Broadcaster, RoomId, ServiceConfig};
//!
//! # async fn example() -> roomcast::Result<()> {
//! let service = Broadcaster::new(ServiceConfig::default());
//! let stats_task = service.spawn_stats_task();
//!
//! let room = RoomId::new("hn");
//! let mut sub = service.subscribe(&room).await;
//!
//! service.post_message("10.0.0.1", &room, "alice", "hello").await?;
//! while let Some(event) = sub.recv().await {
//!     println!("{}: {:?}", event.kind, event.payload);
//! }
//!
//! service.unsubscribe(&room, sub.id()).await;
//! stats_task.abort();
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod counter;
pub mod error;
pub mod hub;
pub mod limiter;
pub mod server;
pub mod stats;

pub use chat::ChatPost;
pub use counter::{CounterStore, Counters};
pub use error::{Error, Result};
pub use hub::{BroadcastHub, Event, EventKind, HubConfig, RoomId, SubscriberId, Subscription};
pub use limiter::{Admission, LimiterConfig, RateLimiter};
pub use server::{Broadcaster, ServiceConfig};
pub use stats::{StatsAggregator, StatsConfig, StatsSnapshot};
