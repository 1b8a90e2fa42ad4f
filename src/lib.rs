//! usb-wifi-bridge: Wi-Fi station to USB Ethernet bridge core
//!
//! This crate bridges Ethernet frames between an upstream wireless station
//! interface and a virtual network interface exposed to a host over a
//! USB-class transport, keeping the exposed side addressed despite a
//! transport whose readiness arrives asynchronously and a lease service
//! that is never quite stopped when asked.
//!
//! # Architecture
//!
//! ```text
//! Station Link ──events──> Upstream Watcher ──> Address Reconciler
//!                                                      │
//! Transport ──attach/detach──> Bridge ── readiness ────┤
//! Endpoint                       │                     v
//!     │                          │              Exposed Interface
//!     └──frames──> Frame Relay <─┴── serialized input queue
//! ```
//!
//! Frame relay runs whenever both sides exist, regardless of addressing
//! state; addressing converges independently through bounded retries with a
//! link-layer fallback.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use usb_wifi_bridge::bridge::Bridge;
//! use usb_wifi_bridge::config::load_config;
//! use usb_wifi_bridge::netcfg::LocalAddressService;
//! use usb_wifi_bridge::transport::LoopbackTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/usb-wifi-bridge/config.json")?;
//! let transport = LoopbackTransport::new();
//! let service = Arc::new(LocalAddressService::default());
//!
//! let bridge = Bridge::new(
//!     &config,
//!     "02:00:11:22:33:55".parse()?,
//!     transport,
//!     service,
//!     None,
//! );
//! // bridge.start(...) wires the backend and applies base addressing
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`bridge`]: Wiring manager and event loops
//! - [`buffer`]: Frame buffers and the bounded pool
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`iface`]: Interface handles and the readiness waiter
//! - [`netcfg`]: Network-configuration service contract
//! - [`reconcile`]: Address reconciliation
//! - [`relay`]: Frame relay between transport and interface
//! - [`station`]: Station Link events
//! - [`transport`]: Transport endpoint contract
//! - [`upstream`]: Upstream address watcher

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod iface;
pub mod netcfg;
pub mod reconcile;
pub mod relay;
pub mod station;
pub mod transport;
pub mod upstream;

// Re-export commonly used types at the crate root
pub use bridge::{Bridge, FrameSink};
pub use buffer::{BufferPool, FrameBuffer, ETHERNET_MTU};
pub use config::{load_config, load_config_with_env, BridgeConfig};
pub use error::{BridgeError, ConfigError};
pub use iface::{wait_ready, AddressAssignment, Interface, MacAddr, Readiness};
pub use reconcile::{AddressReconciler, ReconcileOutcome, RetryPolicy};
pub use relay::{FrameRelay, InboundVerdict, RelayStats};
pub use station::StationEvent;
pub use transport::{SendVerdict, TransportEndpoint, TransportEvent};
pub use upstream::{derive_assignment, UpstreamWatcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
