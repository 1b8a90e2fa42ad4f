//! Configuration types and loading
//!
//! Process-level static configuration: upstream network credentials for the
//! Station Link collaborator, the MAC presented on the USB side, the local
//! base subnet, and tunables for the relay and the reconciler's retry
//! budgets. Loaded from JSON with environment overrides.

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{
    AddressingConfig, BridgeConfig, LogConfig, RelayConfig, UsbConfig, WifiConfig,
};
