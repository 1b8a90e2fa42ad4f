//! Readiness waiter for backend attachment
//!
//! Configuration operations against an interface whose backend hooks are not
//! yet wired produce transient, hard-to-distinguish failures. The waiter
//! turns that asynchronous attachment into a bounded, observable gate:
//! poll until both hooks are wired or the timeout elapses.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::handle::Interface;

/// Fixed backend poll interval
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Both backend hooks wired on an attached link
    Ready,
    /// Timeout elapsed; `attached` reports the best-known link state so the
    /// caller can still fall back to the link-layer record
    TimedOut {
        /// Whether a link record existed when the wait gave up
        attached: bool,
    },
}

impl Readiness {
    /// Whether the backend was confirmed ready
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Wait until `iface`'s backend is wired, or `timeout` elapses
///
/// Observation only, no side effects; idempotent, so re-polling an
/// already-ready interface returns immediately. Safe to call from any number
/// of call sites concurrently.
pub async fn wait_ready(iface: &Interface, timeout: Duration) -> Readiness {
    let deadline = Instant::now() + timeout;
    loop {
        if iface.backend_ready() {
            debug!("{}: backend ready", iface.name());
            return Readiness::Ready;
        }
        if iface.is_attached() {
            debug!(
                "{}: link attached but backend not wired, waiting: {}",
                iface.name(),
                iface.describe()
            );
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
    }

    let attached = iface.is_attached();
    if attached {
        warn!(
            "{}: timed out with link attached but backend not wired: {}",
            iface.name(),
            iface.describe()
        );
    } else {
        warn!("{}: timed out waiting for link attach", iface.name());
    }
    Readiness::TimedOut { attached }
}
