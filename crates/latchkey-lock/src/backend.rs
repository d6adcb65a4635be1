//! Lock backend capability
//!
//! A backend owns the lock entries. The coordinator only asks it to probe and
//! release keys and interprets the answers.

use async_trait::async_trait;
use tracing::trace;

/// Storage that can atomically take and drop named locks.
///
/// Implementations must be safe to call concurrently, and `try_acquire` must be
/// atomic with respect to other `try_acquire` calls on the same key.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Make a single attempt to take `key` for `ttl_ms` milliseconds.
    ///
    /// Returns `true` when the caller now holds the lock and `false` when
    /// someone else does. Must not block beyond one bounded backend call.
    async fn try_acquire(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        ttl_ms: i64,
    ) -> anyhow::Result<bool>;

    /// Drop the lock on `key`. Releasing a key that is not held is not an error.
    async fn release(&self, correlation_id: Option<&str>, key: &str) -> anyhow::Result<()>;
}

/// Backend that grants every lock and forgets it immediately
///
/// Useful for single-process deployments where no coordination is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLockBackend;

#[async_trait]
impl LockBackend for NullLockBackend {
    async fn try_acquire(
        &self,
        _correlation_id: Option<&str>,
        key: &str,
        _ttl_ms: i64,
    ) -> anyhow::Result<bool> {
        trace!(key = %key, "Null lock granted");
        Ok(true)
    }

    async fn release(&self, _correlation_id: Option<&str>, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
