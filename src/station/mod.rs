//! Station Link events
//!
//! Association, authentication and DHCP on the upstream wireless network are
//! owned by the Station Link collaborator; the bridge only consumes its
//! event stream. Reconnection after a disconnect is likewise the
//! collaborator's policy — the bridge logs it and moves on.

use serde::{Deserialize, Serialize};

use crate::iface::AddressAssignment;

/// Event from the Station Link collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum StationEvent {
    /// Associated with the upstream network
    Connected,
    /// Association lost; `reason` is the collaborator's code
    Disconnected {
        /// Disconnect reason code
        reason: i32,
    },
    /// Upstream address learned; triggers exposed-side re-addressing
    AddressAcquired(AddressAssignment),
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_event_round_trips_through_json() {
        let event = StationEvent::AddressAcquired(AddressAssignment::self_gatewayed(
            Ipv4Addr::new(10, 0, 5, 42),
            Ipv4Addr::new(255, 255, 255, 0),
        ));
        let json = serde_json::to_string(&event).expect("serialize");
        let back: StationEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }
}
