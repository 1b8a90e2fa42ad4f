//! In-memory transport endpoint
//!
//! Holds sent segments in a bounded queue instead of a real bus. Used by the
//! soak harness to close the loop without hardware, and by tests to script
//! busy and not-ready behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{SendVerdict, TransportEndpoint};

/// Maximum sent-segment queue depth before the endpoint reports busy
const MAX_QUEUE_DEPTH: usize = 256;

/// Transport endpoint backed by an in-memory queue
#[derive(Debug)]
pub struct LoopbackTransport {
    ready: AtomicBool,
    sent: Mutex<VecDeque<Vec<u8>>>,
    forced_busy: AtomicU32,
}

impl LoopbackTransport {
    /// Create a detached endpoint
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(false),
            sent: Mutex::new(VecDeque::new()),
            forced_busy: AtomicU32::new(0),
        })
    }

    /// Flip the attach state
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Answer `Busy` to the next `n` sends regardless of queue depth
    pub fn force_busy(&self, n: u32) {
        self.forced_busy.store(n, Ordering::Release);
    }

    /// Take the oldest sent segment, if any
    pub fn pop_sent(&self) -> Option<Vec<u8>> {
        self.sent.lock().pop_front()
    }

    /// Number of sent segments waiting
    #[must_use]
    pub fn sent_depth(&self) -> usize {
        self.sent.lock().len()
    }
}

impl TransportEndpoint for LoopbackTransport {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn send_segment(&self, segment: &[u8]) -> SendVerdict {
        if !self.is_ready() {
            return SendVerdict::NotReady;
        }
        if self
            .forced_busy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
        {
            return SendVerdict::Busy;
        }
        let mut sent = self.sent.lock();
        if sent.len() >= MAX_QUEUE_DEPTH {
            trace!("sent queue full, reporting busy ({} bytes)", segment.len());
            return SendVerdict::Busy;
        }
        sent.push_back(segment.to_vec());
        SendVerdict::Accepted(segment.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_attached() {
        let transport = LoopbackTransport::new();
        assert!(!transport.is_ready());
        assert_eq!(transport.send_segment(&[1, 2, 3]), SendVerdict::NotReady);

        transport.set_ready(true);
        assert_eq!(transport.send_segment(&[1, 2, 3]), SendVerdict::Accepted(3));
        assert_eq!(transport.pop_sent(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_sent_segments_keep_order() {
        let transport = LoopbackTransport::new();
        transport.set_ready(true);
        transport.send_segment(&[1]);
        transport.send_segment(&[2]);
        transport.send_segment(&[3]);
        assert_eq!(transport.pop_sent(), Some(vec![1]));
        assert_eq!(transport.pop_sent(), Some(vec![2]));
        assert_eq!(transport.pop_sent(), Some(vec![3]));
        assert_eq!(transport.pop_sent(), None);
    }

    #[test]
    fn test_forced_busy_window() {
        let transport = LoopbackTransport::new();
        transport.set_ready(true);
        transport.force_busy(2);
        assert_eq!(transport.send_segment(&[1]), SendVerdict::Busy);
        assert_eq!(transport.send_segment(&[1]), SendVerdict::Busy);
        assert_eq!(transport.send_segment(&[1]), SendVerdict::Accepted(1));
    }

    #[test]
    fn test_queue_overflow_is_busy() {
        let transport = LoopbackTransport::new();
        transport.set_ready(true);
        for _ in 0..MAX_QUEUE_DEPTH {
            assert_eq!(transport.send_segment(&[0]), SendVerdict::Accepted(1));
        }
        assert_eq!(transport.send_segment(&[0]), SendVerdict::Busy);
    }
}
