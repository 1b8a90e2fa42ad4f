//! Transport endpoint contract
//!
//! The USB-class network backend is an external collaborator. It announces
//! attach/detach over an event channel (rather than a callback-registration
//! mechanism, so the core stays decoupled from any particular host stack)
//! and consumes outbound bytes through a non-blocking send primitive. Frame
//! bytes are opaque to the bridge in both directions.

mod loopback;

pub use loopback::LoopbackTransport;

use serde::{Deserialize, Serialize};

/// Verdict of one send-primitive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendVerdict {
    /// Bytes accepted; count taken
    Accepted(usize),
    /// Endpoint is attached but cannot take bytes right now
    Busy,
    /// Endpoint is not attached; nothing will drain this
    NotReady,
}

/// Attach-state notification from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportEvent {
    /// Host-side backend is up; bring-up may proceed
    Attached,
    /// Host-side backend is gone; backend hooks must be considered stale
    Detached,
}

/// Frame-consuming side of the transport
///
/// `send_segment` is called from the network stack's output context and must
/// never block; a transport that cannot take bytes answers `Busy` or
/// `NotReady` and the caller drops the frame.
pub trait TransportEndpoint: Send + Sync {
    /// Whether the endpoint is attached and able to take bytes
    fn is_ready(&self) -> bool;

    /// Push one segment of an outbound frame toward the host
    fn send_segment(&self, segment: &[u8]) -> SendVerdict;
}
