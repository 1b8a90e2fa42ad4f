//! Error types for usb-wifi-bridge
//!
//! Core-internal errors are handled locally (retried, defaulted, or dropped
//! with a counter) and never unwind across component boundaries; the types
//! here exist for the seams where a caller still has a decision to make.

use std::io;

use thiserror::Error;

pub use crate::iface::LinkUnavailable;
pub use crate::netcfg::NatError;
pub use crate::reconcile::ReconcileError;

/// Top-level error type for usb-wifi-bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reconciliation could not address the interface at all
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Address translation unavailable
    #[error("Translation error: {0}")]
    Nat(#[from] NatError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Check if this error is recoverable (can retry the operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Nat(_) => false,
            // A later attach can make the link record appear
            Self::Reconcile(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path that was tried
        path: String,
    },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError {
        /// Variable name
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

/// Type alias for Result with [`BridgeError`]
pub type Result<T> = std::result::Result<T, BridgeError>;
