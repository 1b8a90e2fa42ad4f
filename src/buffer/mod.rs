//! Frame buffers for the relay boundary
//!
//! This module provides the chained-segment frame buffer that crosses the
//! ownership boundary between the transport side and the network side of the
//! bridge, plus the pool that allocates it.
//!
//! # Ownership
//!
//! A [`FrameBuffer`] is owned by exactly one side at a time and is handed
//! across the relay boundary by move. Release happens exactly once, when the
//! buffer is dropped by whichever side currently owns it; the owning
//! [`BufferPool`] observes every allocation and release through atomic
//! counters, so leaks and double-releases are visible in [`PoolStats`].
//!
//! # Segmenting
//!
//! Buffers are chains of fixed-size segments rather than one contiguous
//! allocation. Producers copy into the chain segment by segment; consumers
//! drain it in segment order. Total length is exact (no trailing slack) and
//! never exceeds the pool MTU.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Ethernet frame MTU including header and framing overhead
pub const ETHERNET_MTU: usize = 1514;

/// Size of one buffer segment
pub const SEGMENT_SIZE: usize = 512;

/// Default cap on buffers alive at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Snapshot of pool counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Buffers successfully allocated since creation
    pub allocated: u64,
    /// Buffers released since creation
    pub released: u64,
    /// Buffers currently alive
    pub in_flight: usize,
    /// Allocations refused because the in-flight cap was reached
    pub failed_exhausted: u64,
    /// Allocations refused because the requested length exceeded the MTU
    pub failed_oversize: u64,
}

/// Allocator for [`FrameBuffer`]s with bounded in-flight depth
///
/// The pool does not recycle segment memory; it exists to enforce the MTU
/// invariant, bound how many frames can be alive at once, and account for
/// every allocation and release.
#[derive(Debug)]
pub struct BufferPool {
    mtu: usize,
    max_in_flight: usize,
    in_flight: AtomicUsize,
    allocated: AtomicU64,
    released: AtomicU64,
    failed_exhausted: AtomicU64,
    failed_oversize: AtomicU64,
}

impl BufferPool {
    /// Create a pool with the given MTU and in-flight cap
    #[must_use]
    pub fn new(mtu: usize, max_in_flight: usize) -> Arc<Self> {
        Arc::new(Self {
            mtu,
            max_in_flight,
            in_flight: AtomicUsize::new(0),
            allocated: AtomicU64::new(0),
            released: AtomicU64::new(0),
            failed_exhausted: AtomicU64::new(0),
            failed_oversize: AtomicU64::new(0),
        })
    }

    /// Create a pool with Ethernet MTU and the default in-flight cap
    #[must_use]
    pub fn with_defaults() -> Arc<Self> {
        Self::new(ETHERNET_MTU, DEFAULT_MAX_IN_FLIGHT)
    }

    /// Pool MTU
    #[must_use]
    pub const fn mtu(&self) -> usize {
        self.mtu
    }

    /// Allocate a buffer sized exactly to `len`, zero-filled
    ///
    /// Returns `None` when `len` is zero or exceeds the MTU, or when the
    /// in-flight cap is reached. Failures are counted, never retried here;
    /// the caller decides whether the frame is dropped.
    pub fn allocate(self: &Arc<Self>, len: usize) -> Option<FrameBuffer> {
        if len == 0 {
            trace!("refusing zero-length allocation");
            return None;
        }
        if len > self.mtu {
            self.failed_oversize.fetch_add(1, Ordering::Relaxed);
            trace!("refusing {} byte allocation, MTU is {}", len, self.mtu);
            return None;
        }
        if self.in_flight.fetch_add(1, Ordering::AcqRel) >= self.max_in_flight {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            self.failed_exhausted.fetch_add(1, Ordering::Relaxed);
            trace!("pool exhausted, {} buffers in flight", self.max_in_flight);
            return None;
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);

        let mut segments = Vec::with_capacity(len.div_ceil(SEGMENT_SIZE));
        let mut remaining = len;
        while remaining > 0 {
            let seg_len = remaining.min(SEGMENT_SIZE);
            segments.push(BytesMut::zeroed(seg_len));
            remaining -= seg_len;
        }

        Some(FrameBuffer {
            segments,
            len,
            pool: Arc::clone(self),
        })
    }

    /// Allocate a buffer and copy `src` into it
    pub fn allocate_copy(self: &Arc<Self>, src: &[u8]) -> Option<FrameBuffer> {
        let mut buffer = self.allocate(src.len())?;
        buffer.copy_from_slice(src);
        Some(buffer)
    }

    /// Current counter snapshot
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            failed_exhausted: self.failed_exhausted.load(Ordering::Relaxed),
            failed_oversize: self.failed_oversize.load(Ordering::Relaxed),
        }
    }

    fn note_release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// A frame as an ordered chain of byte segments
///
/// Not `Clone`: ownership transfers by move, and the pool is credited with
/// the release when the buffer is dropped.
#[derive(Debug)]
pub struct FrameBuffer {
    segments: Vec<BytesMut>,
    len: usize,
    pool: Arc<BufferPool>,
}

impl FrameBuffer {
    /// Total payload length across all segments
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no payload
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments in the chain
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Iterate the segments in chain order
    pub fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.segments.iter().map(|s| s.as_ref())
    }

    /// Copy `src` into the chain, segment by segment
    ///
    /// `src` must match the allocated length exactly.
    pub fn copy_from_slice(&mut self, src: &[u8]) {
        assert_eq!(src.len(), self.len, "source length must match buffer length");
        let mut copied = 0;
        for segment in &mut self.segments {
            let take = segment.len();
            segment.copy_from_slice(&src[copied..copied + take]);
            copied += take;
        }
    }

    /// Gather the chain into one contiguous vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        self.pool.note_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_exact_length() {
        let pool = BufferPool::with_defaults();
        let buf = pool.allocate(100).expect("allocation");
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.segment_count(), 1);

        let buf = pool.allocate(SEGMENT_SIZE + 1).expect("allocation");
        assert_eq!(buf.segment_count(), 2);
        assert_eq!(buf.segments().map(<[u8]>::len).sum::<usize>(), SEGMENT_SIZE + 1);
    }

    #[test]
    fn test_full_mtu_frame_segmenting() {
        let pool = BufferPool::with_defaults();
        let buf = pool.allocate(ETHERNET_MTU).expect("allocation");
        assert_eq!(buf.len(), ETHERNET_MTU);
        assert_eq!(buf.segment_count(), ETHERNET_MTU.div_ceil(SEGMENT_SIZE));
        // No trailing slack in the last segment
        let last = buf.segments().last().expect("segments");
        assert_eq!(last.len(), ETHERNET_MTU % SEGMENT_SIZE);
    }

    #[test]
    fn test_oversize_and_empty_refused() {
        let pool = BufferPool::with_defaults();
        assert!(pool.allocate(ETHERNET_MTU + 1).is_none());
        assert!(pool.allocate(0).is_none());

        let stats = pool.stats();
        assert_eq!(stats.failed_oversize, 1);
        assert_eq!(stats.allocated, 0);
    }

    #[test]
    fn test_copy_round_trips_across_segments() {
        let pool = BufferPool::with_defaults();
        let src: Vec<u8> = (0..1400u32).map(|i| (i % 251) as u8).collect();
        let buf = pool.allocate_copy(&src).expect("allocation");
        assert_eq!(buf.to_vec(), src);

        // Segment order matters: concatenating segments reproduces the source
        let mut gathered = Vec::new();
        for seg in buf.segments() {
            gathered.extend_from_slice(seg);
        }
        assert_eq!(gathered, src);
    }

    #[test]
    fn test_in_flight_cap() {
        let pool = BufferPool::new(ETHERNET_MTU, 2);
        let a = pool.allocate(10).expect("first");
        let _b = pool.allocate(10).expect("second");
        assert!(pool.allocate(10).is_none());
        assert_eq!(pool.stats().failed_exhausted, 1);

        // Releasing one frees a slot
        drop(a);
        assert!(pool.allocate(10).is_some());
    }

    #[test]
    fn test_release_accounting_balances() {
        let pool = BufferPool::with_defaults();
        {
            let _a = pool.allocate(64);
            let _b = pool.allocate(64);
            let stats = pool.stats();
            assert_eq!(stats.allocated, 2);
            assert_eq!(stats.in_flight, 2);
        }
        let stats = pool.stats();
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.in_flight, 0);
    }
}
