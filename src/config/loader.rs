//! Configuration loading and management
//!
//! Loads configuration from JSON files with environment-variable overrides.

use std::path::Path;

use tracing::{debug, info};

use super::types::BridgeConfig;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<BridgeConfig, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: BridgeConfig = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}")))?;

    config.validate()?;

    info!(
        "Configuration loaded: ssid={} base={} mtu={}",
        config.wifi.ssid,
        config.addressing.base_assignment(),
        config.usb.mtu
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `USB_WIFI_BRIDGE_SSID`: Override upstream SSID
/// - `USB_WIFI_BRIDGE_PASSPHRASE`: Override upstream passphrase
/// - `USB_WIFI_BRIDGE_LOG_LEVEL`: Override log level
/// - `USB_WIFI_BRIDGE_BASE_ADDRESS`: Override the base exposed-side address
///
/// # Errors
///
/// Returns `ConfigError` if loading or parsing fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<BridgeConfig, ConfigError> {
    let mut config = load_config(path)?;

    if let Ok(ssid) = std::env::var("USB_WIFI_BRIDGE_SSID") {
        config.wifi.ssid = ssid;
        debug!("SSID overridden to {}", config.wifi.ssid);
    }

    if let Ok(passphrase) = std::env::var("USB_WIFI_BRIDGE_PASSPHRASE") {
        config.wifi.passphrase = passphrase;
        debug!("Passphrase overridden from environment");
    }

    if let Ok(level) = std::env::var("USB_WIFI_BRIDGE_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Ok(addr) = std::env::var("USB_WIFI_BRIDGE_BASE_ADDRESS") {
        config.addressing.base_address = addr.parse().map_err(|_| ConfigError::EnvError {
            name: "USB_WIFI_BRIDGE_BASE_ADDRESS".into(),
            reason: format!("Invalid IPv4 address: {addr}"),
        })?;
        debug!(
            "Base address overridden to {}",
            config.addressing.base_address
        );
    }

    config.validate()?;

    Ok(config)
}

/// Write a default configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = BridgeConfig::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let json = r#"{"wifi": {"ssid": "home-ap", "passphrase": "hunter22"}}"#;
        let config = load_config_str(json).expect("parse");
        assert_eq!(config.wifi.ssid, "home-ap");
        // Everything else defaulted
        assert_eq!(config.addressing.host_suffix, 253);
        assert_eq!(config.relay.input_queue_depth, 64);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let json = r#"{"wifi": {"ssid": "", "passphrase": "hunter22"}}"#;
        assert!(load_config_str(json).is_err());

        let json = r#"{"wifi": {"ssid": "ap", "passphrase": "hunter22"},
                       "usb": {"mac": "garbage"}}"#;
        assert!(load_config_str(json).is_err());
    }

    #[test]
    fn test_default_config_round_trips() {
        let config = BridgeConfig::default_config();
        let json = serde_json::to_string(&config).expect("serialize");
        let back = load_config_str(&json).expect("parse");
        assert_eq!(back.usb.mac, config.usb.mac);
        assert_eq!(back.addressing.base_address, config.addressing.base_address);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load_config("/nonexistent/usb-wifi-bridge.json").expect_err("missing");
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
