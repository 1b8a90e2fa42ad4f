//! Interface handle with backend-attachment and address state

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::types::{AddressAssignment, InterfaceRole, MacAddr};
use crate::buffer::FrameBuffer;

/// Backend hooks wired onto an interface once its transport attaches
///
/// The input hook is the sending side of the network stack's serialized work
/// queue: frame delivery into the stack always goes through it, never through
/// a direct call from the producer's own context.
#[derive(Debug, Clone)]
pub struct Backend {
    input: mpsc::Sender<FrameBuffer>,
}

impl Backend {
    /// Wrap the stack input queue sender
    #[must_use]
    pub const fn new(input: mpsc::Sender<FrameBuffer>) -> Self {
        Self { input }
    }
}

/// The interface has no link-layer record to operate on
#[derive(Debug, Error, PartialEq, Eq)]
#[error("interface {0} has no attached link-layer record")]
pub struct LinkUnavailable(pub String);

#[derive(Debug, Default)]
struct LinkState {
    attached: bool,
    input: Option<mpsc::Sender<FrameBuffer>>,
    output_wired: bool,
    address: Option<AddressAssignment>,
}

/// Handle to one of the bridge's network interfaces
///
/// Created unaddressed and with no backend. The link record attaches when
/// the owning side begins bring-up; the input/output hooks are wired
/// separately and possibly later, which is exactly the window the readiness
/// waiter exists to observe.
#[derive(Debug)]
pub struct Interface {
    role: InterfaceRole,
    name: String,
    mac: MacAddr,
    mtu: usize,
    state: RwLock<LinkState>,
}

impl Interface {
    /// Create a detached, unaddressed handle
    #[must_use]
    pub fn new(role: InterfaceRole, name: impl Into<String>, mac: MacAddr, mtu: usize) -> Arc<Self> {
        Arc::new(Self {
            role,
            name: name.into(),
            mac,
            mtu,
            state: RwLock::new(LinkState::default()),
        })
    }

    /// Interface role
    #[must_use]
    pub const fn role(&self) -> InterfaceRole {
        self.role
    }

    /// Interface name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link-layer MAC address
    #[must_use]
    pub const fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Interface MTU
    #[must_use]
    pub const fn mtu(&self) -> usize {
        self.mtu
    }

    /// Mark the link record attached
    pub fn attach_link(&self) {
        self.state.write().attached = true;
        debug!("{}: link record attached", self.name);
    }

    /// Wire the backend input hook (stack work-queue sender)
    pub fn wire_input(&self, backend: Backend) {
        self.state.write().input = Some(backend.input);
        debug!("{}: backend input wired", self.name);
    }

    /// Mark the backend output path wired
    pub fn wire_output(&self) {
        self.state.write().output_wired = true;
        debug!("{}: backend output wired", self.name);
    }

    /// Drop the backend hooks, keeping the link record and addresses
    ///
    /// Used on transport detach. Re-attach re-wires and re-runs bring-up.
    pub fn detach_backend(&self) {
        let mut state = self.state.write();
        state.input = None;
        state.output_wired = false;
        debug!("{}: backend hooks cleared", self.name);
    }

    /// Whether a link-layer record exists
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.read().attached
    }

    /// Whether both backend hooks are wired on an attached link
    #[must_use]
    pub fn backend_ready(&self) -> bool {
        let state = self.state.read();
        state.attached && state.input.is_some() && state.output_wired
    }

    /// Current address assignment, if any
    #[must_use]
    pub fn address(&self) -> Option<AddressAssignment> {
        self.state.read().address
    }

    /// Record an assignment on the handle
    ///
    /// Used after the configuration service applied it, and for the Station
    /// Interface when an upstream address is learned.
    pub fn record_address(&self, assignment: AddressAssignment) {
        self.state.write().address = Some(assignment);
    }

    /// Set an assignment directly on the link-layer record
    ///
    /// The reconciler's fallback path; bypasses the configuration service
    /// entirely. Requires an attached link record.
    pub fn set_address_direct(
        &self,
        assignment: AddressAssignment,
    ) -> Result<(), LinkUnavailable> {
        let mut state = self.state.write();
        if !state.attached {
            return Err(LinkUnavailable(self.name.clone()));
        }
        state.address = Some(assignment);
        debug!("{}: link-layer address set to {}", self.name, assignment);
        Ok(())
    }

    /// Hand a frame to the interface's input path
    ///
    /// Ownership transfers on success. On failure (no backend, or the
    /// serialized queue is full or gone) the frame comes back so the caller
    /// can release it.
    pub fn try_deliver(&self, frame: FrameBuffer) -> Result<(), FrameBuffer> {
        let input = self.state.read().input.clone();
        match input {
            Some(tx) => tx.try_send(frame).map_err(|e| match e {
                mpsc::error::TrySendError::Full(f)
                | mpsc::error::TrySendError::Closed(f) => f,
            }),
            None => Err(frame),
        }
    }

    /// One-line link-state summary for diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        let state = self.state.read();
        format!(
            "{} role={} mac={} mtu={} attached={} input={} output={} addr={}",
            self.name,
            self.role,
            self.mac,
            self.mtu,
            state.attached,
            state.input.is_some(),
            state.output_wired,
            state
                .address
                .map_or_else(|| "none".to_string(), |a| a.to_string()),
        )
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn test_iface() -> Arc<Interface> {
        Interface::new(
            InterfaceRole::Exposed,
            "usb0",
            "02:00:11:22:33:44".parse().expect("mac"),
            1514,
        )
    }

    fn test_assignment() -> AddressAssignment {
        AddressAssignment::self_gatewayed(
            Ipv4Addr::new(192, 168, 42, 1),
            Ipv4Addr::new(255, 255, 255, 0),
        )
    }

    #[test]
    fn test_backend_ready_requires_all_three() {
        let iface = test_iface();
        assert!(!iface.backend_ready());

        iface.attach_link();
        assert!(iface.is_attached());
        assert!(!iface.backend_ready());

        let (tx, _rx) = mpsc::channel(1);
        iface.wire_input(Backend::new(tx));
        assert!(!iface.backend_ready());

        iface.wire_output();
        assert!(iface.backend_ready());
    }

    #[test]
    fn test_detach_keeps_link_and_address() {
        let iface = test_iface();
        iface.attach_link();
        let (tx, _rx) = mpsc::channel(1);
        iface.wire_input(Backend::new(tx));
        iface.wire_output();
        iface
            .set_address_direct(test_assignment())
            .expect("direct set");

        iface.detach_backend();
        assert!(iface.is_attached());
        assert!(!iface.backend_ready());
        assert_eq!(iface.address(), Some(test_assignment()));
    }

    #[test]
    fn test_direct_set_requires_attached_link() {
        let iface = test_iface();
        let err = iface.set_address_direct(test_assignment());
        assert_eq!(err, Err(LinkUnavailable("usb0".into())));
        assert_eq!(iface.address(), None);

        iface.attach_link();
        assert!(iface.set_address_direct(test_assignment()).is_ok());
        assert_eq!(iface.address(), Some(test_assignment()));
    }

    #[test]
    fn test_try_deliver_without_backend_returns_frame() {
        let iface = test_iface();
        let pool = crate::buffer::BufferPool::with_defaults();
        let frame = pool.allocate(10).expect("allocation");

        let returned = iface.try_deliver(frame).expect_err("no backend");
        assert_eq!(returned.len(), 10);
    }

    #[tokio::test]
    async fn test_try_deliver_transfers_ownership() {
        let iface = test_iface();
        let pool = crate::buffer::BufferPool::with_defaults();
        let (tx, mut rx) = mpsc::channel(1);
        iface.wire_input(Backend::new(tx));

        let frame = pool.allocate(10).expect("allocation");
        iface.try_deliver(frame).expect("delivered");
        assert_eq!(pool.stats().in_flight, 1);

        // Queue full: the second frame comes back
        let frame = pool.allocate(10).expect("allocation");
        let returned = iface.try_deliver(frame).expect_err("queue full");
        drop(returned);

        let queued = rx.recv().await.expect("queued frame");
        assert_eq!(queued.len(), 10);
        drop(queued);
        assert_eq!(pool.stats().in_flight, 0);
    }
}
