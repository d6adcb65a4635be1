//! Lock coordinator
//!
//! Turns a backend's single-shot probe into the three lock operations services
//! use: probe once, acquire with a bounded retry loop, and release.
//!
//! Acquisition is a plain poll at a fixed retry interval. There is no queueing
//! or jitter, so fairness under contention is whatever the backend provides.
//! Dropping the future returned by [`LockCoordinator::acquire_lock`] cancels the
//! retry loop at its next sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use latchkey_common::{ConfigParams, Deadline, LatchkeyError, Reconfigurable, Result};
use tracing::{debug, info, warn};

use crate::backend::LockBackend;

/// Option holding the pause between acquisition attempts, in milliseconds
pub const RETRY_TIMEOUT_OPTION: &str = "options.retry_timeout";

/// Default pause between acquisition attempts, in milliseconds
pub const DEFAULT_RETRY_TIMEOUT_MS: u64 = 100;

pub struct LockCoordinator {
    backend: Arc<dyn LockBackend>,
    retry_interval_ms: AtomicU64,
}

impl LockCoordinator {
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self {
            backend,
            retry_interval_ms: AtomicU64::new(DEFAULT_RETRY_TIMEOUT_MS),
        }
    }

    pub fn with_retry_interval(self, interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.retry_interval_ms.store(ms, Ordering::Relaxed);
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.load(Ordering::Relaxed))
    }

    /// Make a single attempt to take `key`, returning the backend's answer as is
    pub async fn try_acquire_lock(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        ttl_ms: i64,
    ) -> Result<bool> {
        let acquired = self.backend.try_acquire(correlation_id, key, ttl_ms).await?;
        debug!(key = %key, correlation_id = ?correlation_id, acquired, "Lock probe");
        Ok(acquired)
    }

    /// Keep probing `key` until it is taken or `timeout_ms` has passed.
    ///
    /// The first probe always happens, so a zero or negative timeout means
    /// exactly one attempt. Backend errors end the call immediately; only a
    /// negative answer is retried. Fails with [`LatchkeyError::LockTimeout`]
    /// once the deadline is reached without success.
    pub async fn acquire_lock(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        ttl_ms: i64,
        timeout_ms: i64,
    ) -> Result<()> {
        let deadline = Deadline::after(timeout_ms);
        let retry_interval = self.retry_interval();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if self.try_acquire_lock(correlation_id, key, ttl_ms).await? {
                debug!(key = %key, correlation_id = ?correlation_id, attempts, "Lock acquired");
                return Ok(());
            }

            if deadline.is_expired() {
                break;
            }

            tokio::time::sleep(retry_interval).await;
        }

        warn!(
            key = %key,
            correlation_id = ?correlation_id,
            attempts,
            timeout_ms,
            "Acquiring lock failed on timeout"
        );
        Err(LatchkeyError::lock_timeout(correlation_id, key))
    }

    /// Release `key` without checking who holds it
    pub async fn release_lock(&self, correlation_id: Option<&str>, key: &str) -> Result<()> {
        self.backend.release(correlation_id, key).await?;
        debug!(key = %key, correlation_id = ?correlation_id, "Lock released");
        Ok(())
    }
}

impl Reconfigurable for LockCoordinator {
    fn configure(&self, config: &ConfigParams) {
        if !config.contains_key(RETRY_TIMEOUT_OPTION) {
            return;
        }

        match config.get_as_long(RETRY_TIMEOUT_OPTION) {
            Some(ms) => {
                let ms = ms.max(0) as u64;
                self.retry_interval_ms.store(ms, Ordering::Relaxed);
                info!(retry_timeout_ms = ms, "Lock retry interval configured");
            }
            None => warn!(
                value = config.get(RETRY_TIMEOUT_OPTION).unwrap_or_default(),
                "Ignoring unparseable {}", RETRY_TIMEOUT_OPTION
            ),
        }
    }
}
