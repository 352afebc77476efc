//! Engine configuration
//!
//! Retry and backoff values are policy, not structure: they live here so the
//! CLI, tests and embedding applications can tune contention behaviour without
//! touching the lock manager.

use std::time::Duration;

use log::warn;

/// Lock acquisition policy
///
/// Each account lock is attempted up to `max_attempts` times. Every attempt
/// waits at most `attempt_timeout` for the lock. Failed attempts back off
/// exponentially from `base_delay`, capped at `max_delay`, with ±25% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockingConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            attempt_timeout: Duration::from_millis(100),
        }
    }
}

impl LockingConfig {
    /// Create a LockingConfig, replacing zero values with defaults
    ///
    /// A `max_delay` smaller than `base_delay` is raised to `base_delay`.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                "Invalid max_attempts ({}), using default ({})",
                max_attempts, default.max_attempts
            );
            default.max_attempts
        } else {
            max_attempts
        };

        let attempt_timeout = if attempt_timeout.is_zero() {
            warn!(
                "Invalid attempt_timeout ({:?}), using default ({:?})",
                attempt_timeout, default.attempt_timeout
            );
            default.attempt_timeout
        } else {
            attempt_timeout
        };

        let max_delay = if max_delay < base_delay {
            warn!(
                "max_delay ({:?}) is below base_delay ({:?}), raising it",
                max_delay, base_delay
            );
            base_delay
        } else {
            max_delay
        };

        Self {
            max_attempts,
            base_delay,
            max_delay,
            attempt_timeout,
        }
    }
}

/// Transaction service configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Number of worker threads executing transactions
    pub workers: usize,

    pub locking: LockingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            locking: LockingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a ServiceConfig, replacing a zero worker count with the default
    pub fn new(workers: usize, locking: LockingConfig) -> Self {
        let workers = if workers == 0 {
            let default = num_cpus::get();
            warn!("Invalid workers ({}), using default ({})", workers, default);
            default
        } else {
            workers
        };

        Self { workers, locking }
    }
}
