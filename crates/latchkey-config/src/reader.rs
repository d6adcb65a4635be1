//! Cached configuration reader
//!
//! Serves a single snapshot of the loader's output until the staleness window
//! (`timeout`) ends, then replaces it with a fresh load. The snapshot is never
//! merged and never dropped. An absent result is cached like any other, so a
//! source that currently has nothing is not hammered.
//!
//! The whole check-then-refresh sequence runs under one async mutex. Concurrent
//! readers past expiry therefore share a single loader call, and a value is
//! never paired with another load's timestamp.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use latchkey_common::{ConfigParams, Reconfigurable, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::loader::ConfigLoader;

/// Option holding the staleness window, in milliseconds
pub const TIMEOUT_OPTION: &str = "timeout";

/// Default staleness window, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 60000;

struct Snapshot {
    config: Option<Arc<ConfigParams>>,
    last_read: Instant,
}

impl Snapshot {
    fn is_fresh(&self, now: Instant, timeout: Duration) -> bool {
        // A window past the clock's range never ends
        self.last_read
            .checked_add(timeout)
            .is_none_or(|until| now < until)
    }
}

pub struct CachedConfigReader {
    loader: Arc<dyn ConfigLoader>,
    timeout_ms: AtomicU64,
    snapshot: Mutex<Option<Snapshot>>,
}

impl CachedConfigReader {
    pub fn new(loader: Arc<dyn ConfigLoader>) -> Self {
        Self {
            loader,
            timeout_ms: AtomicU64::new(DEFAULT_TIMEOUT_MS),
            snapshot: Mutex::new(None),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_timeout(&self, timeout: Duration) {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms.store(ms, Ordering::Relaxed);
    }

    /// Return the cached configuration, reloading it once the window has passed.
    ///
    /// A loader failure is returned to the caller and leaves the previous
    /// snapshot in place.
    pub async fn read_config(
        &self,
        correlation_id: Option<&str>,
        parameters: &ConfigParams,
    ) -> Result<Option<Arc<ConfigParams>>> {
        let mut snapshot = self.snapshot.lock().await;

        if let Some(current) = snapshot.as_ref()
            && current.is_fresh(Instant::now(), self.timeout())
        {
            debug!(correlation_id = ?correlation_id, "Config cache hit");
            return Ok(current.config.clone());
        }

        let config = self
            .loader
            .load(correlation_id, parameters)
            .await?
            .map(Arc::new);

        debug!(
            correlation_id = ?correlation_id,
            present = config.is_some(),
            "Config snapshot refreshed"
        );

        *snapshot = Some(Snapshot {
            config: config.clone(),
            last_read: Instant::now(),
        });

        Ok(config)
    }

    /// Read the configuration and extract one of its sections.
    ///
    /// Returns `None` when the configuration itself is absent.
    pub async fn read_config_section(
        &self,
        correlation_id: Option<&str>,
        parameters: &ConfigParams,
        section: &str,
    ) -> Result<Option<ConfigParams>> {
        let config = self.read_config(correlation_id, parameters).await?;
        Ok(config.map(|config| config.get_section(section)))
    }
}

impl Reconfigurable for CachedConfigReader {
    fn configure(&self, config: &ConfigParams) {
        if !config.contains_key(TIMEOUT_OPTION) {
            return;
        }

        match config.get_as_long(TIMEOUT_OPTION) {
            Some(ms) => {
                let ms = ms.max(0) as u64;
                self.timeout_ms.store(ms, Ordering::Relaxed);
                info!(timeout_ms = ms, "Config cache timeout configured");
            }
            None => warn!(
                value = config.get(TIMEOUT_OPTION).unwrap_or_default(),
                "Ignoring unparseable {}", TIMEOUT_OPTION
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32};

    use super::*;
    use crate::loader::{FnConfigLoader, MemoryConfigLoader};

    /// Loader returning `{"a": n}` where n is the call number
    fn counting_loader(calls: Arc<AtomicU32>) -> Arc<dyn ConfigLoader> {
        Arc::new(FnConfigLoader::new(move |_, _| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Some(ConfigParams::from_tuples([("a", n.to_string())])))
        }))
    }

    #[test]
    fn test_default_timeout() {
        let reader = CachedConfigReader::new(Arc::new(MemoryConfigLoader::empty()));
        assert_eq!(reader.timeout(), Duration::from_millis(60000));
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let reader = CachedConfigReader::new(Arc::new(MemoryConfigLoader::empty()));
        reader.set_timeout(Duration::MAX);
        assert_eq!(reader.timeout(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_configure_timeout() {
        let reader = CachedConfigReader::new(Arc::new(MemoryConfigLoader::empty()));

        reader.configure(&ConfigParams::parse("timeout=50"));
        assert_eq!(reader.timeout(), Duration::from_millis(50));

        reader.configure(&ConfigParams::parse("options.retry_timeout=5"));
        reader.configure(&ConfigParams::parse("timeout=later"));
        assert_eq!(reader.timeout(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_window() {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = CachedConfigReader::new(counting_loader(calls.clone()));

        let first = reader.read_config(None, &ConfigParams::new()).await.unwrap();
        let second = reader.read_config(None, &ConfigParams::new()).await.unwrap();

        assert!(Arc::ptr_eq(first.as_ref().unwrap(), second.as_ref().unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_after_window() {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = CachedConfigReader::new(counting_loader(calls.clone()))
            .with_timeout(Duration::from_millis(100));

        let first = reader.read_config(None, &ConfigParams::new()).await.unwrap();
        assert_eq!(first.unwrap().get("a"), Some("1"));

        tokio::time::advance(Duration::from_millis(100)).await;
        let second = reader.read_config(None, &ConfigParams::new()).await.unwrap();
        assert_eq!(second.unwrap().get("a"), Some("2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_always_reloads() {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = CachedConfigReader::new(counting_loader(calls.clone()))
            .with_timeout(Duration::ZERO);

        for _ in 0..3 {
            reader.read_config(None, &ConfigParams::new()).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_config_is_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let reader = CachedConfigReader::new(Arc::new(FnConfigLoader::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })));

        assert!(reader.read_config(None, &ConfigParams::new()).await.unwrap().is_none());
        assert!(reader.read_config(None, &ConfigParams::new()).await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let calls = Arc::new(AtomicU32::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let (counter, failing) = (calls.clone(), fail.clone());
        let reader = CachedConfigReader::new(Arc::new(FnConfigLoader::new(move |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if failing.load(Ordering::SeqCst) {
                anyhow::bail!("source offline");
            }
            Ok(Some(ConfigParams::from_tuples([("a", n.to_string())])))
        })))
        .with_timeout(Duration::from_millis(50));

        let first = reader.read_config(None, &ConfigParams::new()).await.unwrap();
        assert_eq!(first.unwrap().get("a"), Some("1"));

        fail.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_millis(50)).await;
        let err = reader.read_config(None, &ConfigParams::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "source offline");

        // The old snapshot kept its timestamp, so the next read tries again
        fail.store(false, Ordering::SeqCst);
        let config = reader.read_config(None, &ConfigParams::new()).await.unwrap();
        assert_eq!(config.unwrap().get("a"), Some("3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_section() {
        let loader = MemoryConfigLoader::new(ConfigParams::parse(
            "db.host=localhost;db.port=5432;name=svc",
        ));
        let reader = CachedConfigReader::new(Arc::new(loader));

        let db = reader
            .read_config_section(None, &ConfigParams::new(), "db")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(db, ConfigParams::parse("host=localhost;port=5432"));

        let missing = reader
            .read_config_section(None, &ConfigParams::new(), "cache")
            .await
            .unwrap()
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_share_one_load() {
        let calls = Arc::new(AtomicU32::new(0));
        let reader = Arc::new(CachedConfigReader::new(counting_loader(calls.clone())));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let reader = reader.clone();
                tokio::spawn(async move {
                    reader
                        .read_config(Some("req"), &ConfigParams::new())
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let config = handle.await.unwrap().unwrap();
            assert_eq!(config.get("a"), Some("1"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
