//! Coordinator configuration.

use std::time::Duration;

/// Tuning knobs for the run coordinator.
///
/// The poll loop is bounded: an interval between status retrievals and a
/// hard deadline after which the turn fails with a timeout.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Delay between successive run-status retrievals.
    pub poll_interval: Duration,
    /// Maximum total time to wait for a run to leave its pending states.
    pub poll_deadline: Duration,
    /// Pause between a newly authored module's write and its load, so the
    /// filesystem write settles before the load attempt.
    pub settle_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(400),
            poll_deadline: Duration::from_secs(120),
            settle_delay: Duration::from_millis(300),
        }
    }
}

impl CoordinatorConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll deadline.
    pub fn with_poll_deadline(mut self, deadline: Duration) -> Self {
        self.poll_deadline = deadline;
        self
    }

    /// Set the settle delay used before activating a newly authored
    /// function.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}
