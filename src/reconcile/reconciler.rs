//! The reconciler itself

use std::sync::Arc;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::policy::RetryPolicy;
use crate::iface::{wait_ready, AddressAssignment, Interface};
use crate::netcfg::{AddressService, AssignOutcome, StartOutcome, StopOutcome};

/// Terminal success of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Applied through the configuration service
    Applied,
    /// Applied by writing the link-layer record directly
    AppliedViaFallback,
}

/// Terminal failure of a reconciliation
///
/// Only reachable when the backend never attached *and* no link-layer record
/// exists to write; with a record present the fallback always lands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// Nothing to address: no backend, no link record
    #[error("{iface}: backend not ready and no link-layer record to fall back to")]
    LinkAbsent {
        /// Interface the reconciliation targeted
        iface: String,
    },
}

/// Serializes stop/assign/start against the configuration service
///
/// Runs on a dedicated worker task; every wait is bounded, so a
/// reconciliation always terminates within [`RetryPolicy::worst_case`].
/// There is no cancellation: once started, a reconciliation runs to its
/// terminal outcome. Concurrent reconciliations against the same interface
/// are not mutually excluded; the last writer wins on the handle.
pub struct AddressReconciler {
    service: Arc<dyn AddressService>,
    policy: RetryPolicy,
}

impl AddressReconciler {
    /// Create a reconciler over `service` with the given budgets
    #[must_use]
    pub fn new(service: Arc<dyn AddressService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Active retry policy
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Bring `iface`'s assignment to `desired`
    ///
    /// With `manage_service` set, the lease service is (re)started after the
    /// assignment lands; a start failure is logged and never downgrades the
    /// outcome.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::LinkAbsent`] when neither the service path nor the
    /// link-layer fallback has anything to operate on.
    pub async fn reconcile(
        &self,
        iface: &Interface,
        desired: AddressAssignment,
        manage_service: bool,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        info!("{}: reconciling address to {}", iface.name(), desired);

        let readiness = wait_ready(iface, self.policy.readiness_timeout).await;
        if !readiness.is_ready() {
            // The service path against an unattached backend is defined to
            // race; only the link-layer record may be written here.
            warn!(
                "{}: backend not confirmed ready, skipping service path",
                iface.name()
            );
            return match iface.set_address_direct(desired) {
                Ok(()) => {
                    info!("{}: link-layer fallback set {}", iface.name(), desired);
                    Ok(ReconcileOutcome::AppliedViaFallback)
                }
                Err(_) => {
                    warn!("{}: no link-layer record for fallback", iface.name());
                    Err(ReconcileError::LinkAbsent {
                        iface: iface.name().to_string(),
                    })
                }
            };
        }

        self.stop_service(iface).await;

        let outcome = if self.apply_assignment(iface, desired).await {
            iface.record_address(desired);
            ReconcileOutcome::Applied
        } else {
            warn!(
                "{}: service did not accept {} within budget, using link-layer fallback",
                iface.name(),
                desired
            );
            match iface.set_address_direct(desired) {
                Ok(()) => {
                    info!("{}: link-layer fallback set {}", iface.name(), desired);
                    ReconcileOutcome::AppliedViaFallback
                }
                // A detach raced the reconciliation away from under us
                Err(_) => {
                    return Err(ReconcileError::LinkAbsent {
                        iface: iface.name().to_string(),
                    })
                }
            }
        };

        if manage_service {
            self.start_service(iface).await;
        }

        Ok(outcome)
    }

    /// Stop the lease service, tolerating "already stopped" and bounded busy
    ///
    /// Exhausting the budget is not fatal: the assignment step detects the
    /// conflict on its own.
    async fn stop_service(&self, iface: &Interface) {
        for attempt in 1..=self.policy.stop_attempts {
            match self.service.stop(iface).await {
                StopOutcome::Stopped => {
                    debug!("{}: lease service stop ok (attempt {})", iface.name(), attempt);
                    return;
                }
                StopOutcome::AlreadyStopped => {
                    debug!("{}: lease service already stopped", iface.name());
                    return;
                }
                StopOutcome::Busy => {
                    debug!(
                        "{}: lease service busy on stop attempt {}, retrying",
                        iface.name(),
                        attempt
                    );
                    sleep(self.policy.stop_delay).await;
                }
            }
        }
        warn!(
            "{}: lease service still busy after {} stop attempts, continuing",
            iface.name(),
            self.policy.stop_attempts
        );
    }

    /// Set the assignment, retiring not-stopped conflicts with recovery stops
    async fn apply_assignment(&self, iface: &Interface, desired: AddressAssignment) -> bool {
        for attempt in 1..=self.policy.assign_attempts {
            match self.service.set_assignment(iface, desired).await {
                AssignOutcome::Applied => {
                    info!(
                        "{}: assignment {} applied (attempt {})",
                        iface.name(),
                        desired,
                        attempt
                    );
                    return true;
                }
                AssignOutcome::NotStopped => {
                    warn!(
                        "{}: service not fully stopped on attempt {}, stopping again",
                        iface.name(),
                        attempt
                    );
                    let recovery = self.service.stop(iface).await;
                    debug!("{}: recovery stop returned {:?}", iface.name(), recovery);
                    sleep(self.policy.assign_delay).await;
                }
                AssignOutcome::Rejected(reason) => {
                    warn!(
                        "{}: assignment attempt {} rejected: {}, retrying",
                        iface.name(),
                        attempt,
                        reason
                    );
                    sleep(self.policy.assign_delay).await;
                }
            }
        }
        false
    }

    /// Start the lease service; bounded, logged, never escalated
    async fn start_service(&self, iface: &Interface) {
        for attempt in 1..=self.policy.start_attempts {
            match self.service.start(iface).await {
                StartOutcome::Started => {
                    info!("{}: lease service started (attempt {})", iface.name(), attempt);
                    return;
                }
                StartOutcome::Busy => {
                    debug!(
                        "{}: lease service busy on start attempt {}, retrying",
                        iface.name(),
                        attempt
                    );
                    sleep(self.policy.start_delay).await;
                }
                StartOutcome::Failed(reason) => {
                    warn!(
                        "{}: lease service start attempt {} failed: {}",
                        iface.name(),
                        attempt,
                        reason
                    );
                    sleep(self.policy.start_delay).await;
                }
            }
        }
        warn!(
            "{}: lease service failed to start; host may need a static address",
            iface.name()
        );
    }
}
