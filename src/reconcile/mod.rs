//! Address reconciliation against a possibly-busy configuration service
//!
//! Bringing an interface's address into the desired state is not atomic: the
//! lease service may be mid-transition, its stop is driven by background
//! timers, and the backend may not even be attached yet. The reconciler
//! serializes stop → assign → start with bounded retries and guarantees the
//! interface ends up addressed whenever a link-layer record exists at all,
//! by falling back to a direct link-layer write when the service never
//! cooperates.
//!
//! ```text
//! reconcile(iface, desired)
//!     |
//!     v
//! readiness gate (wait_ready, bounded)
//!     |-- not ready, link attached --> link-layer fallback only
//!     |-- not ready, no link       --> Failed
//!     v ready
//! stop service   (bounded retries, "already stopped" is success,
//!     |           exhaustion is non-fatal)
//!     v
//! set assignment (bounded retries, conflict triggers one recovery stop)
//!     |-- exhausted --> link-layer fallback
//!     v
//! start service  (optional, bounded, failure never downgrades the outcome)
//! ```

mod policy;
mod reconciler;

pub use policy::RetryPolicy;
pub use reconciler::{AddressReconciler, ReconcileError, ReconcileOutcome};
