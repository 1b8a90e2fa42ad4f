//! Network-configuration service contract
//!
//! The local address-assignment service (the DHCP-server manager on the
//! exposed side) is an external collaborator. The bridge only depends on the
//! narrow contract here: stop, set a static assignment, start. Outcomes are
//! explicit because the interesting ones are not errors — "already stopped"
//! is success, and "not stopped yet" is a transient conflict the reconciler
//! retires with bounded retries.

mod local;

pub use local::LocalAddressService;

use async_trait::async_trait;
use thiserror::Error;

use crate::iface::{AddressAssignment, Interface};

/// Result of asking the service to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Service stopped
    Stopped,
    /// Service was not running; treated as success
    AlreadyStopped,
    /// Service is mid-transition; retry after a delay
    Busy,
}

/// Result of setting a static assignment through the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Assignment applied
    Applied,
    /// The service has not fully stopped; stop again and retry
    NotStopped,
    /// Any other service-side refusal
    Rejected(String),
}

/// Result of starting the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Service running
    Started,
    /// Service is mid-transition; retry after a delay
    Busy,
    /// Start failed; the interface keeps its address regardless
    Failed(String),
}

/// Address-assignment service for one interface
///
/// Implementations are expected to be externally driven (background timers,
/// their own task) which is exactly why none of these calls are atomic with
/// respect to each other.
#[async_trait]
pub trait AddressService: Send + Sync {
    /// Stop handing out leases
    async fn stop(&self, iface: &Interface) -> StopOutcome;

    /// Apply a static assignment to the interface
    async fn set_assignment(
        &self,
        iface: &Interface,
        assignment: AddressAssignment,
    ) -> AssignOutcome;

    /// Resume handing out leases
    async fn start(&self, iface: &Interface) -> StartOutcome;
}

/// Address translation could not be enabled
#[derive(Debug, Error)]
#[error("address translation unavailable on {iface}: {reason}")]
pub struct NatError {
    /// Interface translation was requested on
    pub iface: String,
    /// Why it was refused
    pub reason: String,
}

/// Control surface for upstream address translation
///
/// Enabled once on the station side after both interfaces hold addresses.
/// Policy beyond the enable call is out of the bridge's hands.
pub trait NatControl: Send + Sync {
    /// Enable translation on `iface`
    ///
    /// # Errors
    ///
    /// Returns [`NatError`] when the platform has no translation support;
    /// logged by the caller, never fatal.
    fn enable(&self, iface: &Interface) -> Result<(), NatError>;
}
