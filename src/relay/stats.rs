//! Relay diagnostic counters
//!
//! Every dropped frame increments exactly one counter; drops are silent at
//! the protocol level, so these counters are the only way an operator sees
//! them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for both relay directions
#[derive(Debug, Default)]
pub struct RelayStats {
    pub(crate) inbound_frames: AtomicU64,
    pub(crate) inbound_bytes: AtomicU64,
    pub(crate) outbound_frames: AtomicU64,
    pub(crate) outbound_bytes: AtomicU64,
    pub(crate) dropped_inbound_empty: AtomicU64,
    pub(crate) dropped_inbound_no_backend: AtomicU64,
    pub(crate) dropped_inbound_alloc: AtomicU64,
    pub(crate) dropped_inbound_queue_full: AtomicU64,
    pub(crate) dropped_outbound_busy: AtomicU64,
    pub(crate) dropped_outbound_not_ready: AtomicU64,
}

impl RelayStats {
    /// Point-in-time copy of all counters
    #[must_use]
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            inbound_frames: self.inbound_frames.load(Ordering::Relaxed),
            inbound_bytes: self.inbound_bytes.load(Ordering::Relaxed),
            outbound_frames: self.outbound_frames.load(Ordering::Relaxed),
            outbound_bytes: self.outbound_bytes.load(Ordering::Relaxed),
            dropped_inbound_empty: self.dropped_inbound_empty.load(Ordering::Relaxed),
            dropped_inbound_no_backend: self.dropped_inbound_no_backend.load(Ordering::Relaxed),
            dropped_inbound_alloc: self.dropped_inbound_alloc.load(Ordering::Relaxed),
            dropped_inbound_queue_full: self.dropped_inbound_queue_full.load(Ordering::Relaxed),
            dropped_outbound_busy: self.dropped_outbound_busy.load(Ordering::Relaxed),
            dropped_outbound_not_ready: self.dropped_outbound_not_ready.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`RelayStats`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayStatsSnapshot {
    /// Frames relayed transport → exposed interface
    pub inbound_frames: u64,
    /// Bytes relayed transport → exposed interface
    pub inbound_bytes: u64,
    /// Frames relayed exposed interface → transport
    pub outbound_frames: u64,
    /// Bytes relayed exposed interface → transport
    pub outbound_bytes: u64,
    /// Inbound frames refused for zero length
    pub dropped_inbound_empty: u64,
    /// Inbound frames refused with no backend attached
    pub dropped_inbound_no_backend: u64,
    /// Inbound frames refused because allocation failed
    pub dropped_inbound_alloc: u64,
    /// Inbound frames refused by the serialized input queue
    pub dropped_inbound_queue_full: u64,
    /// Outbound frames dropped on a busy transport
    pub dropped_outbound_busy: u64,
    /// Outbound frames dropped on a detached transport
    pub dropped_outbound_not_ready: u64,
}

impl RelayStatsSnapshot {
    /// Total drops across both directions
    #[must_use]
    pub const fn total_dropped(&self) -> u64 {
        self.dropped_inbound_empty
            + self.dropped_inbound_no_backend
            + self.dropped_inbound_alloc
            + self.dropped_inbound_queue_full
            + self.dropped_outbound_busy
            + self.dropped_outbound_not_ready
    }
}
