//! Retry budgets for reconciliation
//!
//! The exact counts and delays are tunable, not load-bearing: they bound the
//! worst-case latency of an inherently racy sequence, nothing more. Defaults
//! reflect observed settle times of lease services driven by background
//! timers.

use std::time::Duration;

/// Retry budgets and delays for one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts to stop the lease service
    pub stop_attempts: u32,
    /// Delay between stop attempts
    pub stop_delay: Duration,
    /// Attempts to set the static assignment
    pub assign_attempts: u32,
    /// Delay between assignment attempts
    pub assign_delay: Duration,
    /// Attempts to start the lease service
    pub start_attempts: u32,
    /// Delay between start attempts
    pub start_delay: Duration,
    /// How long to wait for backend attachment before configuring
    pub readiness_timeout: Duration,
}

impl RetryPolicy {
    /// Worst-case wall-clock latency of a full reconciliation
    #[must_use]
    pub fn worst_case(&self) -> Duration {
        self.readiness_timeout
            + self.stop_delay * self.stop_attempts
            + self.assign_delay * self.assign_attempts
            + self.start_delay * self.start_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            stop_attempts: 8,
            stop_delay: Duration::from_millis(120),
            assign_attempts: 8,
            assign_delay: Duration::from_millis(150),
            start_attempts: 8,
            start_delay: Duration::from_millis(200),
            readiness_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.stop_attempts, 8);
        assert_eq!(policy.assign_attempts, 8);
        assert_eq!(policy.readiness_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_worst_case_is_finite_and_additive() {
        let policy = RetryPolicy::default();
        let expected = Duration::from_secs(5)
            + Duration::from_millis(120 * 8)
            + Duration::from_millis(150 * 8)
            + Duration::from_millis(200 * 8);
        assert_eq!(policy.worst_case(), expected);
    }
}
