//! Core interface value types

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the bridge an interface sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceRole {
    /// Virtual interface presented to the USB-attached host
    Exposed,
    /// Interface associated with the upstream wireless network
    Station,
}

impl fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exposed => write!(f, "exposed"),
            Self::Station => write!(f, "station"),
        }
    }
}

/// IPv4 address triple for one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAssignment {
    /// Interface address
    pub address: Ipv4Addr,
    /// Subnet mask
    pub netmask: Ipv4Addr,
    /// Gateway address
    pub gateway: Ipv4Addr,
}

impl AddressAssignment {
    /// Create an assignment
    #[must_use]
    pub const fn new(address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            address,
            netmask,
            gateway,
        }
    }

    /// Create an assignment that gateways through its own address
    ///
    /// This is the shape both bridge-side interfaces use: the device itself
    /// is the gateway for the host behind it.
    #[must_use]
    pub const fn self_gatewayed(address: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self::new(address, netmask, address)
    }

    /// Network this assignment belongs to
    ///
    /// Returns `None` for a non-contiguous netmask, which configuration
    /// validation refuses up front.
    #[must_use]
    pub fn network(&self) -> Option<Ipv4Net> {
        Ipv4Net::with_netmask(self.address, self.netmask)
            .ok()
            .map(|n| n.trunc())
    }

    /// Whether two assignments share or overlap address space
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self.network(), other.network()) {
            (Some(a), Some(b)) => {
                a.contains(&b.network()) || b.contains(&a.network())
            }
            _ => false,
        }
    }
}

impl fmt::Display for AddressAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} gw {}", self.address, self.netmask, self.gateway)
    }
}

/// 48-bit MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Raw octets
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Whether the locally-administered bit is set
    #[must_use]
    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Error parsing a MAC address string
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct MacAddrParseError(pub String);

impl FromStr for MacAddr {
    type Err = MacAddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in &mut octets {
            let part = parts
                .next()
                .ok_or_else(|| MacAddrParseError(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| MacAddrParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacAddrParseError(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
