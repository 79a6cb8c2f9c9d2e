//! Coordinator configuration.

use std::time::Duration;

/// Configuration for the [`SharingCoordinator`](crate::SharingCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Appends retried after a tail conflict before giving up.
    ///
    /// A share makes at most `max_append_retries + 1` append attempts.
    pub max_append_retries: u32,
    /// Backoff before the first retry. Doubles on each further retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
    /// Whether `bootstrap` validates an existing ledger.
    pub verify_chain_on_bootstrap: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_append_retries: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            verify_chain_on_bootstrap: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn max_append_retries(mut self, retries: u32) -> Self {
        self.max_append_retries = retries;
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn verify_chain_on_bootstrap(mut self, verify: bool) -> Self {
        self.verify_chain_on_bootstrap = verify;
        self
    }

    /// Total append attempts a share may make.
    pub fn max_append_attempts(&self) -> u32 {
        self.max_append_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based): `initial * 2^retry`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}
