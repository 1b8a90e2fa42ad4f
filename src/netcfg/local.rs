//! In-process address service with a realistic stop lifecycle
//!
//! A reference implementation of [`AddressService`] whose `stop` does not
//! settle instantly: the service passes through a `Stopping` window during
//! which `set_assignment` reports the not-stopped conflict and `stop`
//! reports busy, the same shape as a lease service with background timers.
//! The soak harness and integration tests run the reconciler against this.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{AddressService, AssignOutcome, StartOutcome, StopOutcome};
use crate::iface::{AddressAssignment, Interface};

/// Default time a stop takes to settle
pub const DEFAULT_STOP_SETTLE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
enum ServiceState {
    Stopped,
    Stopping { settled_at: Instant },
    Running,
}

/// Lease service with a non-instant stop transition
#[derive(Debug)]
pub struct LocalAddressService {
    state: Mutex<ServiceState>,
    assignment: Mutex<Option<AddressAssignment>>,
    stop_settle: Duration,
}

impl LocalAddressService {
    /// Create a stopped service whose stop transition takes `stop_settle`
    #[must_use]
    pub fn new(stop_settle: Duration) -> Self {
        Self {
            state: Mutex::new(ServiceState::Stopped),
            assignment: Mutex::new(None),
            stop_settle,
        }
    }

    /// Whether the service is currently handing out leases
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), ServiceState::Running)
    }

    /// The assignment leases are handed out from, if set
    #[must_use]
    pub fn assignment(&self) -> Option<AddressAssignment> {
        *self.assignment.lock()
    }

    /// Collapse `Stopping` into `Stopped` once the settle window has passed
    fn settle(&self, state: &mut ServiceState) {
        if let ServiceState::Stopping { settled_at } = *state {
            if Instant::now() >= settled_at {
                *state = ServiceState::Stopped;
            }
        }
    }
}

impl Default for LocalAddressService {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_SETTLE)
    }
}

#[async_trait]
impl AddressService for LocalAddressService {
    async fn stop(&self, iface: &Interface) -> StopOutcome {
        let mut state = self.state.lock();
        self.settle(&mut state);
        match *state {
            ServiceState::Stopped => StopOutcome::AlreadyStopped,
            ServiceState::Stopping { .. } => StopOutcome::Busy,
            ServiceState::Running => {
                *state = ServiceState::Stopping {
                    settled_at: Instant::now() + self.stop_settle,
                };
                debug!("{}: lease service stopping", iface.name());
                StopOutcome::Stopped
            }
        }
    }

    async fn set_assignment(
        &self,
        iface: &Interface,
        assignment: AddressAssignment,
    ) -> AssignOutcome {
        let mut state = self.state.lock();
        self.settle(&mut state);
        match *state {
            ServiceState::Running | ServiceState::Stopping { .. } => AssignOutcome::NotStopped,
            ServiceState::Stopped => {
                *self.assignment.lock() = Some(assignment);
                debug!("{}: assignment set to {}", iface.name(), assignment);
                AssignOutcome::Applied
            }
        }
    }

    async fn start(&self, iface: &Interface) -> StartOutcome {
        let mut state = self.state.lock();
        self.settle(&mut state);
        match *state {
            ServiceState::Running => StartOutcome::Started,
            ServiceState::Stopping { .. } => StartOutcome::Busy,
            ServiceState::Stopped => {
                if self.assignment.lock().is_none() {
                    return StartOutcome::Failed("no assignment to lease from".into());
                }
                *state = ServiceState::Running;
                debug!("{}: lease service started", iface.name());
                StartOutcome::Started
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::iface::InterfaceRole;

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

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_stopped_is_already_stopped() {
        let svc = LocalAddressService::default();
        let iface = test_iface();
        assert_eq!(svc.stop(&iface).await, StopOutcome::AlreadyStopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assignment_conflicts_until_stop_settles() {
        let svc = LocalAddressService::new(Duration::from_millis(200));
        let iface = test_iface();
        let desired = test_assignment();

        // Bring the service up first
        assert_eq!(svc.set_assignment(&iface, desired).await, AssignOutcome::Applied);
        assert_eq!(svc.start(&iface).await, StartOutcome::Started);

        // Running: conflict
        assert_eq!(
            svc.set_assignment(&iface, desired).await,
            AssignOutcome::NotStopped
        );

        // Stop begins but has not settled
        assert_eq!(svc.stop(&iface).await, StopOutcome::Stopped);
        assert_eq!(
            svc.set_assignment(&iface, desired).await,
            AssignOutcome::NotStopped
        );
        assert_eq!(svc.stop(&iface).await, StopOutcome::Busy);

        // After the settle window the assignment goes through
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(svc.set_assignment(&iface, desired).await, AssignOutcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_needs_an_assignment() {
        let svc = LocalAddressService::default();
        let iface = test_iface();

        assert!(matches!(svc.start(&iface).await, StartOutcome::Failed(_)));

        assert_eq!(
            svc.set_assignment(&iface, test_assignment()).await,
            AssignOutcome::Applied
        );
        assert_eq!(svc.start(&iface).await, StartOutcome::Started);
        assert!(svc.is_running());

        // Starting a running service is success
        assert_eq!(svc.start(&iface).await, StartOutcome::Started);
    }
}
