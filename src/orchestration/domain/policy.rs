//! Timing and capacity policy for the orchestration loop.

use std::time::Duration;

/// Delay between two ticks of one job's loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Delay before a `retrying` task returns to `pending`.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Maximum number of concurrently running tasks per job.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Attempts allowed for each newly planned task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Age after which an unrenewed run lease may be taken over.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);

/// Policy values applied by the orchestration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestrationPolicy {
    poll_interval: Duration,
    retry_delay: Duration,
    max_concurrency: usize,
    default_max_attempts: u32,
    lease_ttl: Duration,
}

impl Default for OrchestrationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }
}

impl OrchestrationPolicy {
    /// Sets the delay between ticks.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the delay before a retrying task returns to `pending`.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the attempts allowed for newly planned tasks.
    #[must_use]
    pub const fn with_default_max_attempts(mut self, default_max_attempts: u32) -> Self {
        self.default_max_attempts = default_max_attempts;
        self
    }

    /// Sets how long a run lease survives without renewal.
    ///
    /// The loop renews its lease every tick, so this should exceed the poll
    /// interval.
    #[must_use]
    pub const fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Returns the delay between ticks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the retry delay.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the concurrency ceiling.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns the attempts allowed for newly planned tasks.
    #[must_use]
    pub const fn default_max_attempts(&self) -> u32 {
        self.default_max_attempts
    }

    /// Returns the run lease lifetime.
    #[must_use]
    pub const fn lease_ttl(&self) -> Duration {
        self.lease_ttl
    }
}
