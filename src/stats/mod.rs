//! Runtime and traffic statistics

pub mod aggregator;
pub mod config;
pub mod memory;
pub mod snapshot;

pub use aggregator::StatsAggregator;
pub use config::StatsConfig;
pub use memory::{CountingAllocator, MemoryProbe, MemorySample, ProcessProbe};
pub use snapshot::{StatsHandle, StatsSnapshot};
