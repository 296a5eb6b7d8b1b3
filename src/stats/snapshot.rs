//! Stats snapshots
//!
//! A snapshot is one tick's worth of aggregated numbers. It is `Copy` and is
//! always replaced as a whole, so readers can never see fields from two
//! different ticks.

use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Point-in-time server statistics for one tick interval
///
/// Serialized with the field names browsers already consume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Unix time of the tick in seconds
    #[serde(rename = "Timestamp")]
    pub timestamp: u64,
    /// Heap bytes in use
    #[serde(rename = "HeapInuse")]
    pub heap_in_use: u64,
    /// Stack bytes in use
    #[serde(rename = "StackInuse")]
    pub stack_in_use: u64,
    /// Allocations since the previous tick
    #[serde(rename = "Mallocs")]
    pub mallocs_delta: u64,
    /// Frees since the previous tick
    #[serde(rename = "Frees")]
    pub frees_delta: u64,
    /// Messages accepted from publishers since the previous tick
    #[serde(rename = "Inbound")]
    pub inbound_delta: u64,
    /// Messages handed to subscribers since the previous tick
    #[serde(rename = "Outbound")]
    pub outbound_delta: u64,
    /// Currently connected subscribers
    #[serde(rename = "Connected")]
    pub connected_count: u64,
}

impl StatsSnapshot {
    /// True until the first tick has produced a snapshot
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Encode as JSON
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Shared read access to the latest snapshot
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    latest: Arc<RwLock<StatsSnapshot>>,
}

impl StatsHandle {
    /// Create a handle holding the empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, or an empty one before the first tick
    pub fn get(&self) -> StatsSnapshot {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn replace(&self, snapshot: StatsSnapshot) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}
