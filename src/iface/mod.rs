//! Interface handles and backend readiness
//!
//! The bridge works with two interface handles: the Exposed Interface
//! presented to the USB-attached host, and the Station Interface associated
//! with the upstream wireless network. Handles are explicit and injected into
//! every operation that needs them; nothing in this crate reaches for a
//! global singleton.
//!
//! An interface's backend (the transport-facing input and output hooks)
//! attaches asynchronously relative to handle creation. [`wait_ready`] is the
//! only sanctioned way to observe that attachment before configuration.

mod handle;
mod readiness;
mod types;

pub use handle::{Backend, Interface, LinkUnavailable};
pub use readiness::{wait_ready, Readiness, READY_POLL_INTERVAL};
pub use types::{AddressAssignment, InterfaceRole, MacAddr, MacAddrParseError};
