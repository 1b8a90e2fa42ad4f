//! Configuration types for usb-wifi-bridge

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::ETHERNET_MTU;
use crate::error::ConfigError;
use crate::iface::{AddressAssignment, MacAddr};
use crate::reconcile::RetryPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Upstream wireless network credentials (consumed by the Station Link)
    pub wifi: WifiConfig,

    /// USB-side identity
    #[serde(default)]
    pub usb: UsbConfig,

    /// Base subnet and reconciliation tunables
    #[serde(default)]
    pub addressing: AddressingConfig,

    /// Relay queue and pool depths
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl BridgeConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wifi.validate()?;
        self.usb.validate()?;
        self.addressing.validate()?;
        self.relay.validate()?;
        Ok(())
    }

    /// Create a minimal default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            wifi: WifiConfig {
                ssid: "upstream-ap".into(),
                passphrase: "changeme8".into(),
            },
            usb: UsbConfig::default(),
            addressing: AddressingConfig::default(),
            relay: RelayConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Upstream wireless credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WifiConfig {
    /// Network name
    pub ssid: String,
    /// WPA2 passphrase; empty for an open network
    pub passphrase: String,
}

impl WifiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(ConfigError::ValidationError(format!(
                "SSID must be 1-32 bytes, got {}",
                self.ssid.len()
            )));
        }
        if !self.passphrase.is_empty() && (self.passphrase.len() < 8 || self.passphrase.len() > 64)
        {
            return Err(ConfigError::ValidationError(
                "passphrase must be 8-64 bytes, or empty for an open network".into(),
            ));
        }
        Ok(())
    }
}

/// USB-side interface identity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsbConfig {
    /// MAC presented to the host; must be locally administered
    #[serde(default = "default_mac")]
    pub mac: MacAddr,

    /// MTU of the exposed interface
    #[serde(default = "default_mtu")]
    pub mtu: usize,
}

impl UsbConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.mac.is_locally_administered() {
            return Err(ConfigError::ValidationError(format!(
                "USB MAC {} must have the locally-administered bit set",
                self.mac
            )));
        }
        if self.mtu < 576 || self.mtu > ETHERNET_MTU {
            return Err(ConfigError::ValidationError(format!(
                "MTU must be 576-{ETHERNET_MTU}, got {}",
                self.mtu
            )));
        }
        Ok(())
    }
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            mac: default_mac(),
            mtu: default_mtu(),
        }
    }
}

/// Base subnet and reconciliation tunables
///
/// Retry counts and delays are deliberately configuration, not constants:
/// they bound a race against an external service, and the right values
/// depend on that service's settle times.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressingConfig {
    /// Local-only default address for the exposed interface
    #[serde(default = "default_base_address")]
    pub base_address: Ipv4Addr,

    /// Netmask for the base subnet
    #[serde(default = "default_base_netmask")]
    pub base_netmask: Ipv4Addr,

    /// Host suffix used when following the station's network
    #[serde(default = "default_host_suffix")]
    pub host_suffix: u8,

    /// Attempts to stop the lease service
    #[serde(default = "default_attempts")]
    pub stop_attempts: u32,

    /// Milliseconds between stop attempts
    #[serde(default = "default_stop_delay_ms")]
    pub stop_delay_ms: u64,

    /// Attempts to set the static assignment
    #[serde(default = "default_attempts")]
    pub assign_attempts: u32,

    /// Milliseconds between assignment attempts
    #[serde(default = "default_assign_delay_ms")]
    pub assign_delay_ms: u64,

    /// Attempts to start the lease service
    #[serde(default = "default_attempts")]
    pub start_attempts: u32,

    /// Milliseconds between start attempts
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Milliseconds to wait for backend attachment before configuring
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,
}

impl AddressingConfig {
    /// The base assignment, self-gatewayed
    #[must_use]
    pub const fn base_assignment(&self) -> AddressAssignment {
        AddressAssignment::self_gatewayed(self.base_address, self.base_netmask)
    }

    /// Retry policy for the reconciler
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            stop_attempts: self.stop_attempts,
            stop_delay: Duration::from_millis(self.stop_delay_ms),
            assign_attempts: self.assign_attempts,
            assign_delay: Duration::from_millis(self.assign_delay_ms),
            start_attempts: self.start_attempts,
            start_delay: Duration::from_millis(self.start_delay_ms),
            readiness_timeout: Duration::from_millis(self.readiness_timeout_ms),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_assignment().network().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "base netmask {} is not contiguous",
                self.base_netmask
            )));
        }
        if self.host_suffix == 0 || self.host_suffix == 255 {
            return Err(ConfigError::ValidationError(format!(
                "host suffix {} collides with the network or broadcast address",
                self.host_suffix
            )));
        }
        if self.stop_attempts == 0 || self.assign_attempts == 0 || self.start_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry attempt counts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AddressingConfig {
    fn default() -> Self {
        Self {
            base_address: default_base_address(),
            base_netmask: default_base_netmask(),
            host_suffix: default_host_suffix(),
            stop_attempts: default_attempts(),
            stop_delay_ms: default_stop_delay_ms(),
            assign_attempts: default_attempts(),
            assign_delay_ms: default_assign_delay_ms(),
            start_attempts: default_attempts(),
            start_delay_ms: default_start_delay_ms(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
        }
    }
}

/// Relay queue and pool depths
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Depth of the serialized input queue into the network stack
    #[serde(default = "default_input_queue_depth")]
    pub input_queue_depth: usize,

    /// Cap on frame buffers alive at once
    #[serde(default = "default_max_frames_in_flight")]
    pub max_frames_in_flight: usize,
}

impl RelayConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.input_queue_depth == 0 || self.max_frames_in_flight == 0 {
            return Err(ConfigError::ValidationError(
                "relay queue depths must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            input_queue_depth: default_input_queue_depth(),
            max_frames_in_flight: default_max_frames_in_flight(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("text" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include the emitting module in log lines
    #[serde(default)]
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: false,
        }
    }
}

fn default_mac() -> MacAddr {
    MacAddr([0x02, 0x00, 0x11, 0x22, 0x33, 0x44])
}

const fn default_mtu() -> usize {
    ETHERNET_MTU
}

const fn default_base_address() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 42, 1)
}

const fn default_base_netmask() -> Ipv4Addr {
    Ipv4Addr::new(255, 255, 255, 0)
}

const fn default_host_suffix() -> u8 {
    253
}

const fn default_attempts() -> u32 {
    8
}

const fn default_stop_delay_ms() -> u64 {
    120
}

const fn default_assign_delay_ms() -> u64 {
    150
}

const fn default_start_delay_ms() -> u64 {
    200
}

const fn default_readiness_timeout_ms() -> u64 {
    5000
}

const fn default_input_queue_depth() -> usize {
    64
}

const fn default_max_frames_in_flight() -> usize {
    64
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}
