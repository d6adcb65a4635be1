//! Shared fixtures for the Latchkey integration tests
//!
//! Backends and loaders here wrap the real in-memory implementations and count
//! calls, so tests can assert how often the coordinator and the reader reach
//! out to their collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use latchkey_common::ConfigParams;
use latchkey_config::ConfigLoader;
use latchkey_lock::LockBackend;

/// Install test logging once per test binary
pub fn init_logging() {
    latchkey_common::logging::init_for_tests();
}

/// Wraps a lock backend and counts probe and release calls
pub struct CountingLockBackend<B> {
    inner: B,
    probes: AtomicU32,
    releases: AtomicU32,
}

impl<B: LockBackend> CountingLockBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            probes: AtomicU32::new(0),
            releases: AtomicU32::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<B: LockBackend> LockBackend for CountingLockBackend<B> {
    async fn try_acquire(
        &self,
        correlation_id: Option<&str>,
        key: &str,
        ttl_ms: i64,
    ) -> anyhow::Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire(correlation_id, key, ttl_ms).await
    }

    async fn release(&self, correlation_id: Option<&str>, key: &str) -> anyhow::Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(correlation_id, key).await
    }
}

/// Backend whose probes never succeed
#[derive(Debug, Default)]
pub struct AlwaysHeldBackend;

#[async_trait]
impl LockBackend for AlwaysHeldBackend {
    async fn try_acquire(
        &self,
        _correlation_id: Option<&str>,
        _key: &str,
        _ttl_ms: i64,
    ) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn release(&self, _correlation_id: Option<&str>, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Error raised by [`UnreachableBackend`]
#[derive(Debug, thiserror::Error)]
#[error("lock store unreachable")]
pub struct StoreUnreachable;

/// Backend that fails every call
#[derive(Debug, Default)]
pub struct UnreachableBackend;

#[async_trait]
impl LockBackend for UnreachableBackend {
    async fn try_acquire(
        &self,
        _correlation_id: Option<&str>,
        _key: &str,
        _ttl_ms: i64,
    ) -> anyhow::Result<bool> {
        Err(StoreUnreachable.into())
    }

    async fn release(&self, _correlation_id: Option<&str>, _key: &str) -> anyhow::Result<()> {
        Err(StoreUnreachable.into())
    }
}

/// Loader producing `{"a": n, "tenant.name": "acme", "tenant.jobs": n}` for call number n.
///
/// Can be switched into a failing mode or into returning no configuration.
#[derive(Debug, Default)]
pub struct CountingLoader {
    calls: AtomicU32,
    failing: AtomicBool,
    absent: AtomicBool,
}

impl CountingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_absent(&self, absent: bool) {
        self.absent.store(absent, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigLoader for CountingLoader {
    async fn load(
        &self,
        _correlation_id: Option<&str>,
        _parameters: &ConfigParams,
    ) -> anyhow::Result<Option<ConfigParams>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("config source unavailable");
        }
        if self.absent.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(ConfigParams::from_tuples([
            ("a", n.to_string()),
            ("tenant.name", "acme".to_string()),
            ("tenant.jobs", n.to_string()),
        ])))
    }
}
