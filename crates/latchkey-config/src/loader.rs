//! Configuration loader capability and in-process adapters

use async_trait::async_trait;
use latchkey_common::ConfigParams;
use parking_lot::RwLock;

/// A source of configuration, possibly slow, rate limited or failing.
///
/// `Ok(None)` means the source currently has no configuration at all.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(
        &self,
        correlation_id: Option<&str>,
        parameters: &ConfigParams,
    ) -> anyhow::Result<Option<ConfigParams>>;
}

/// Loader serving a configuration held in memory
#[derive(Debug, Default)]
pub struct MemoryConfigLoader {
    config: RwLock<Option<ConfigParams>>,
}

impl MemoryConfigLoader {
    pub fn new(config: ConfigParams) -> Self {
        Self {
            config: RwLock::new(Some(config)),
        }
    }

    /// Loader with nothing to serve until [`set_config`](Self::set_config) is called
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace what subsequent loads return
    pub fn set_config(&self, config: Option<ConfigParams>) {
        *self.config.write() = config;
    }
}

#[async_trait]
impl ConfigLoader for MemoryConfigLoader {
    async fn load(
        &self,
        _correlation_id: Option<&str>,
        _parameters: &ConfigParams,
    ) -> anyhow::Result<Option<ConfigParams>> {
        Ok(self.config.read().clone())
    }
}

/// Adapts a synchronous fetch function into a [`ConfigLoader`]
pub struct FnConfigLoader<F> {
    fetch: F,
}

impl<F> FnConfigLoader<F>
where
    F: Fn(Option<&str>, &ConfigParams) -> anyhow::Result<Option<ConfigParams>> + Send + Sync,
{
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F> ConfigLoader for FnConfigLoader<F>
where
    F: Fn(Option<&str>, &ConfigParams) -> anyhow::Result<Option<ConfigParams>> + Send + Sync,
{
    async fn load(
        &self,
        correlation_id: Option<&str>,
        parameters: &ConfigParams,
    ) -> anyhow::Result<Option<ConfigParams>> {
        (self.fetch)(correlation_id, parameters)
    }
}
