// In-memory lock backend
// Keeps held keys with their expiry in a DashMap; expired entries are taken over on the next
// acquire attempt and swept every PURGE_EVERY_ATTEMPTS attempts or by a background purge task

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use latchkey_common::millis;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::backend::LockBackend;

/// Acquire attempts between two opportunistic sweeps of expired entries
pub const PURGE_EVERY_ATTEMPTS: u64 = 1024;

/// A held lock
#[derive(Debug, Clone, Copy)]
pub(crate) struct LockEntry {
    acquired_at: Instant,
    ttl: Duration,
}

impl LockEntry {
    fn new(acquired_at: Instant, ttl_ms: i64) -> Self {
        Self {
            acquired_at,
            ttl: millis(ttl_ms),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.acquired_at + self.ttl
    }
}

/// Lock backend living in process memory
///
/// Exclusive within one process only. Each key is free again once its TTL
/// elapses, whether or not it was released.
#[derive(Debug, Default)]
pub struct MemoryLockBackend {
    pub(crate) locks: DashMap<String, LockEntry>,
    attempts: AtomicU64,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held and not yet expired
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    /// Number of live (unexpired) locks
    pub fn held_count(&self) -> usize {
        let now = Instant::now();
        self.locks
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.locks.len();
        self.locks.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.locks.len());

        if removed > 0 {
            debug!(count = removed, "Cleaned up expired lock entries");
        }
        removed
    }

    /// Spawn a task that purges expired entries every `every`
    ///
    /// The task holds only a weak reference and ends once the backend is dropped.
    pub fn spawn_purge(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let backend = Arc::downgrade(self);
        let every = every.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(backend) = backend.upgrade() else {
                    break;
                };
                backend.purge_expired();
            }
        })
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn try_acquire(
        &self,
        _correlation_id: Option<&str>,
        key: &str,
        ttl_ms: i64,
    ) -> anyhow::Result<bool> {
        if self.attempts.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY_ATTEMPTS
            == PURGE_EVERY_ATTEMPTS - 1
        {
            self.purge_expired();
        }

        let now = Instant::now();

        // The entry guard holds the shard lock, making check-and-set atomic per key
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Ok(false);
                }
                occupied.insert(LockEntry::new(now, ttl_ms));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry::new(now, ttl_ms));
            }
        }

        Ok(true)
    }

    async fn release(&self, _correlation_id: Option<&str>, key: &str) -> anyhow::Result<()> {
        self.locks.remove(key);
        Ok(())
    }
}
