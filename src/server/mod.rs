//! Broadcast service wiring
//!
//! Inbound requests pass through the rate limiter before reaching the hub;
//! the stats aggregator runs beside them on its own tick.

pub mod config;
pub mod service;

pub use config::ServiceConfig;
pub use service::Broadcaster;
