//! Upstream watcher: follow the station's address
//!
//! Once the station learns an upstream address, the exposed interface is
//! re-addressed into the station's network pattern with a reserved host
//! suffix, so the host behind the bridge lands in address space that routes
//! cleanly through the upstream side. This is the single place re-addressing
//! happens after initial bring-up.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::iface::{AddressAssignment, Interface};
use crate::netcfg::NatControl;
use crate::reconcile::AddressReconciler;

/// Reserved host suffix for the exposed interface when following the station
pub const EXPOSED_HOST_SUFFIX: u8 = 253;

/// Netmask assumed when the station's assignment does not carry one
pub const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Derive the exposed interface's assignment from the station's
///
/// Keeps the station's network-address byte pattern, substitutes
/// `host_suffix` in the final octet, copies the station netmask (`/24` when
/// unspecified) and gateways through the derived address itself.
#[must_use]
pub fn derive_assignment(station: &AddressAssignment, host_suffix: u8) -> AddressAssignment {
    let octets = station.address.octets();
    let address = Ipv4Addr::new(octets[0], octets[1], octets[2], host_suffix);
    let netmask = if station.netmask.is_unspecified() {
        DEFAULT_NETMASK
    } else {
        station.netmask
    };
    AddressAssignment::self_gatewayed(address, netmask)
}

/// Reacts to station address acquisition
///
/// The exposed handle is bound late: the watcher may see an address-acquired
/// event before the exposed interface has been created at all, in which case
/// it logs and does nothing.
pub struct UpstreamWatcher {
    station: Arc<Interface>,
    exposed: RwLock<Option<Arc<Interface>>>,
    reconciler: Arc<AddressReconciler>,
    nat: Option<Arc<dyn NatControl>>,
    host_suffix: u8,
}

impl UpstreamWatcher {
    /// Create a watcher over the station handle
    #[must_use]
    pub fn new(
        station: Arc<Interface>,
        reconciler: Arc<AddressReconciler>,
        nat: Option<Arc<dyn NatControl>>,
        host_suffix: u8,
    ) -> Self {
        Self {
            station,
            exposed: RwLock::new(None),
            reconciler,
            nat,
            host_suffix,
        }
    }

    /// Bind the exposed interface once it exists
    pub fn bind_exposed(&self, iface: Arc<Interface>) {
        *self.exposed.write() = Some(iface);
    }

    /// Handle a learned upstream address
    ///
    /// Records it on the station handle, enables translation (both sides
    /// hold addresses from here on), and re-runs reconciliation against the
    /// exposed interface with the derived assignment.
    pub async fn on_station_address_acquired(&self, assignment: AddressAssignment) {
        info!("{}: upstream address acquired: {}", self.station.name(), assignment);
        self.station.record_address(assignment);

        if let Some(nat) = &self.nat {
            match nat.enable(&self.station) {
                Ok(()) => info!("{}: address translation enabled", self.station.name()),
                Err(e) => warn!("{}", e),
            }
        }

        let exposed = self.exposed.read().clone();
        let Some(exposed) = exposed else {
            warn!("exposed interface not created yet, skipping re-addressing");
            return;
        };

        let desired = derive_assignment(&assignment, self.host_suffix);
        info!(
            "{}: re-addressing to {} (following station)",
            exposed.name(),
            desired
        );
        match self.reconciler.reconcile(&exposed, desired, true).await {
            Ok(outcome) => info!("{}: re-addressing done: {:?}", exposed.name(), outcome),
            Err(e) => warn!("{}: re-addressing failed: {}", exposed.name(), e),
        }
    }
}
