//! Frame relay between the transport and the exposed interface
//!
//! Two one-directional paths that run regardless of addressing state
//! (link-layer forwarding needs no IP):
//!
//! ```text
//! Transport Endpoint                      Exposed Interface
//!   on_transport_frame(bytes)  ----->  serialized input queue (mpsc)
//!                                          (network stack context)
//!   send_segment(seg) <-------------  on_network_frame(buffer)
//! ```
//!
//! Inbound delivery posts into the interface's serialized input queue and
//! never calls into the stack from the transport's own context. Neither
//! direction queues frames while the other side is unavailable: a frame that
//! cannot be handed over right now is dropped and counted, keeping both
//! paths non-blocking under a peer that may never come up.
//!
//! Within one direction frames reach the destination in submission order;
//! no ordering holds between directions.

mod stats;

pub use stats::{RelayStats, RelayStatsSnapshot};

use std::sync::Arc;

use tracing::{trace, warn};

use crate::buffer::{BufferPool, FrameBuffer};
use crate::iface::Interface;
use crate::transport::{SendVerdict, TransportEndpoint};

/// Verdict of one inbound relay step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundVerdict {
    /// Frame handed to the exposed interface; ownership transferred
    Accepted,
    /// Frame dropped; counted, never retried or queued
    Rejected(RejectReason),
}

/// Why an inbound frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Zero-length input
    EmptyFrame,
    /// Exposed interface has no attached backend
    BackendNotReady,
    /// Buffer allocation refused (oversize or pool exhausted)
    AllocationFailed,
    /// Serialized input queue full or gone
    InputQueueFull,
}

/// Moves frames between the transport endpoint and the exposed interface
pub struct FrameRelay {
    exposed: Arc<Interface>,
    pool: Arc<BufferPool>,
    transport: Arc<dyn TransportEndpoint>,
    stats: Arc<RelayStats>,
}

impl FrameRelay {
    /// Create a relay over the given interface, pool and transport
    #[must_use]
    pub fn new(
        exposed: Arc<Interface>,
        pool: Arc<BufferPool>,
        transport: Arc<dyn TransportEndpoint>,
    ) -> Arc<Self> {
        Arc::new(Self {
            exposed,
            pool,
            transport,
            stats: Arc::new(RelayStats::default()),
        })
    }

    /// Relay counters
    #[must_use]
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Inbound path: one raw frame from the transport
    ///
    /// Invoked from the transport's delivery context. Backend readiness is
    /// checked before any allocation; a rejected frame costs nothing but a
    /// counter. On accept, a buffer sized exactly to the input is filled
    /// across its segments and posted to the interface's input queue, which
    /// takes ownership; if the queue refuses, the buffer is released here.
    pub fn on_transport_frame(&self, bytes: &[u8]) -> InboundVerdict {
        use std::sync::atomic::Ordering::Relaxed;

        if bytes.is_empty() {
            self.stats.dropped_inbound_empty.fetch_add(1, Relaxed);
            return InboundVerdict::Rejected(RejectReason::EmptyFrame);
        }
        if !self.exposed.backend_ready() {
            self.stats.dropped_inbound_no_backend.fetch_add(1, Relaxed);
            trace!(
                "{}: dropping {} inbound bytes, backend not attached",
                self.exposed.name(),
                bytes.len()
            );
            return InboundVerdict::Rejected(RejectReason::BackendNotReady);
        }

        let Some(frame) = self.pool.allocate_copy(bytes) else {
            self.stats.dropped_inbound_alloc.fetch_add(1, Relaxed);
            warn!(
                "{}: buffer allocation failed for {} inbound bytes",
                self.exposed.name(),
                bytes.len()
            );
            return InboundVerdict::Rejected(RejectReason::AllocationFailed);
        };

        match self.exposed.try_deliver(frame) {
            Ok(()) => {
                self.stats.inbound_frames.fetch_add(1, Relaxed);
                self.stats.inbound_bytes.fetch_add(bytes.len() as u64, Relaxed);
                InboundVerdict::Accepted
            }
            Err(frame) => {
                // Refused by the serialized queue; release here, exactly once
                drop(frame);
                self.stats.dropped_inbound_queue_full.fetch_add(1, Relaxed);
                InboundVerdict::Rejected(RejectReason::InputQueueFull)
            }
        }
    }

    /// Outbound path: one frame produced by the exposed interface
    ///
    /// Runs in whatever context the network stack invokes output from and
    /// never blocks: a transport that answers busy or not-ready costs the
    /// frame, not a stall. Segments drain in chain order; the buffer is
    /// released exactly once on every path out. Returns the bytes the
    /// transport accepted.
    pub fn on_network_frame(&self, frame: FrameBuffer) -> usize {
        use std::sync::atomic::Ordering::Relaxed;

        if !self.transport.is_ready() {
            self.stats.dropped_outbound_not_ready.fetch_add(1, Relaxed);
            trace!(
                "{}: transport not ready, dropping {} outbound bytes",
                self.exposed.name(),
                frame.len()
            );
            drop(frame);
            return 0;
        }

        let mut total = 0usize;
        let mut complete = true;
        for segment in frame.segments() {
            match self.transport.send_segment(segment) {
                SendVerdict::Accepted(n) => total += n,
                SendVerdict::Busy => {
                    self.stats.dropped_outbound_busy.fetch_add(1, Relaxed);
                    trace!("{}: transport busy mid-frame", self.exposed.name());
                    complete = false;
                    break;
                }
                SendVerdict::NotReady => {
                    self.stats.dropped_outbound_not_ready.fetch_add(1, Relaxed);
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            self.stats.outbound_frames.fetch_add(1, Relaxed);
            self.stats.outbound_bytes.fetch_add(total as u64, Relaxed);
        }
        drop(frame);
        total
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use tokio::sync::mpsc;

    use super::*;
    use crate::buffer::ETHERNET_MTU;
    use crate::iface::{Backend, InterfaceRole};
    use crate::transport::LoopbackTransport;

    fn exposed_iface() -> Arc<Interface> {
        Interface::new(
            InterfaceRole::Exposed,
            "usb0",
            "02:00:11:22:33:44".parse().expect("mac"),
            ETHERNET_MTU,
        )
    }

    fn wire_backend(iface: &Interface, depth: usize) -> mpsc::Receiver<FrameBuffer> {
        let (tx, rx) = mpsc::channel(depth);
        iface.attach_link();
        iface.wire_input(Backend::new(tx));
        iface.wire_output();
        rx
    }

    fn relay_setup(
        queue_depth: usize,
    ) -> (
        Arc<FrameRelay>,
        Arc<BufferPool>,
        Arc<LoopbackTransport>,
        mpsc::Receiver<FrameBuffer>,
    ) {
        let iface = exposed_iface();
        let rx = wire_backend(&iface, queue_depth);
        let pool = BufferPool::with_defaults();
        let transport = LoopbackTransport::new();
        transport.set_ready(true);
        let relay = FrameRelay::new(iface, Arc::clone(&pool), transport.clone() as _);
        (relay, pool, transport, rx)
    }

    #[test]
    fn test_inbound_without_backend_allocates_nothing() {
        // Full-MTU frame arrives before the backend is attached
        let iface = exposed_iface();
        let pool = BufferPool::with_defaults();
        let transport = LoopbackTransport::new();
        let relay = FrameRelay::new(iface, Arc::clone(&pool), transport as _);

        let frame = vec![0u8; ETHERNET_MTU];
        let verdict = relay.on_transport_frame(&frame);
        assert_eq!(
            verdict,
            InboundVerdict::Rejected(RejectReason::BackendNotReady)
        );
        assert_eq!(pool.stats().allocated, 0);
        assert_eq!(relay.stats().snapshot().dropped_inbound_no_backend, 1);
    }

    #[test]
    fn test_inbound_rejects_empty_frame() {
        let (relay, pool, _transport, _rx) = relay_setup(4);
        assert_eq!(
            relay.on_transport_frame(&[]),
            InboundVerdict::Rejected(RejectReason::EmptyFrame)
        );
        assert_eq!(pool.stats().allocated, 0);
    }

    #[test]
    fn test_inbound_rejects_oversize_frame() {
        let (relay, pool, _transport, _rx) = relay_setup(4);
        let frame = vec![0u8; ETHERNET_MTU + 1];
        assert_eq!(
            relay.on_transport_frame(&frame),
            InboundVerdict::Rejected(RejectReason::AllocationFailed)
        );
        assert_eq!(pool.stats().failed_oversize, 1);
        assert_eq!(pool.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_inbound_preserves_order_and_content() {
        let n = 32;
        let (relay, _pool, _transport, mut rx) = relay_setup(n);

        for i in 0..n {
            let frame = vec![i as u8; 64 + i];
            assert_eq!(relay.on_transport_frame(&frame), InboundVerdict::Accepted);
        }

        for i in 0..n {
            let delivered = rx.recv().await.expect("frame");
            assert_eq!(delivered.len(), 64 + i);
            assert_eq!(delivered.to_vec(), vec![i as u8; 64 + i]);
        }
        assert_eq!(relay.stats().snapshot().inbound_frames, n as u64);
    }

    #[test]
    fn test_inbound_queue_full_releases_buffer() {
        let (relay, pool, _transport, _rx) = relay_setup(1);

        assert_eq!(relay.on_transport_frame(&[1; 10]), InboundVerdict::Accepted);
        assert_eq!(
            relay.on_transport_frame(&[2; 10]),
            InboundVerdict::Rejected(RejectReason::InputQueueFull)
        );

        // One buffer queued, the rejected one released
        let stats = pool.stats();
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.in_flight, 1);
    }

    #[test]
    fn test_single_release_under_randomized_rejection() {
        // Mixed accept/reject responses: every allocation is matched by
        // exactly one release once all sides drop their frames
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let (relay, pool, _transport, mut rx) = relay_setup(4);

        for _ in 0..500 {
            let len = rng.gen_range(1..=ETHERNET_MTU);
            let frame = vec![0xabu8; len];
            let _ = relay.on_transport_frame(&frame);
            // Randomly drain so the bounded queue sometimes overflows
            if rng.gen_bool(0.5) {
                while let Ok(f) = rx.try_recv() {
                    drop(f);
                }
            }
        }
        while let Ok(f) = rx.try_recv() {
            drop(f);
        }

        let stats = pool.stats();
        assert!(stats.allocated > 0);
        assert_eq!(stats.allocated, stats.released);
        assert_eq!(stats.in_flight, 0);
    }

    #[test]
    fn test_outbound_drains_segments_in_order() {
        let (relay, pool, transport, _rx) = relay_setup(4);

        let payload: Vec<u8> = (0..1400u32).map(|i| (i % 251) as u8).collect();
        let frame = pool.allocate_copy(&payload).expect("allocation");
        let expected_segments = frame.segment_count();

        let sent = relay.on_network_frame(frame);
        assert_eq!(sent, 1400);
        assert_eq!(pool.stats().in_flight, 0);

        let mut gathered = Vec::new();
        let mut segments = 0;
        while let Some(seg) = transport.pop_sent() {
            gathered.extend_from_slice(&seg);
            segments += 1;
        }
        assert_eq!(segments, expected_segments);
        assert_eq!(gathered, payload);

        let snapshot = relay.stats().snapshot();
        assert_eq!(snapshot.outbound_frames, 1);
        assert_eq!(snapshot.outbound_bytes, 1400);
    }

    #[test]
    fn test_outbound_not_ready_drops_and_releases() {
        let (relay, pool, transport, _rx) = relay_setup(4);
        transport.set_ready(false);

        let frame = pool.allocate_copy(&[1; 100]).expect("allocation");
        assert_eq!(relay.on_network_frame(frame), 0);
        assert_eq!(pool.stats().in_flight, 0);

        let snapshot = relay.stats().snapshot();
        assert_eq!(snapshot.dropped_outbound_not_ready, 1);
        assert_eq!(snapshot.outbound_frames, 0);
    }

    #[test]
    fn test_outbound_busy_mid_frame_drops_remainder() {
        // Transport that accepts the first segment, then answers busy
        struct OneThenBusy {
            sent: std::sync::atomic::AtomicU32,
        }
        impl TransportEndpoint for OneThenBusy {
            fn is_ready(&self) -> bool {
                true
            }
            fn send_segment(&self, segment: &[u8]) -> SendVerdict {
                if self.sent.fetch_add(1, std::sync::atomic::Ordering::AcqRel) == 0 {
                    SendVerdict::Accepted(segment.len())
                } else {
                    SendVerdict::Busy
                }
            }
        }

        let iface = exposed_iface();
        iface.attach_link();
        iface.wire_output();
        let pool = BufferPool::with_defaults();
        let gate = Arc::new(OneThenBusy {
            sent: std::sync::atomic::AtomicU32::new(0),
        });
        let relay = FrameRelay::new(iface, Arc::clone(&pool), gate as _);

        let payload = vec![7u8; 1000];
        let frame = pool.allocate_copy(&payload).expect("allocation");
        assert!(frame.segment_count() > 1);
        let first_len = frame.segments().next().expect("segment").len();

        let sent = relay.on_network_frame(frame);
        assert_eq!(sent, first_len);
        assert_eq!(pool.stats().in_flight, 0);
        let snapshot = relay.stats().snapshot();
        assert_eq!(snapshot.dropped_outbound_busy, 1);
        assert_eq!(snapshot.outbound_frames, 0);
    }
}
