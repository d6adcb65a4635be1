//! Latchkey Config - Cached configuration reads
//!
//! This crate provides:
//! - `ConfigLoader`, the capability a configuration source implements
//! - `CachedConfigReader`, which serves one snapshot until its staleness window ends
//! - `MemoryConfigLoader` and `FnConfigLoader` adapters

pub mod loader;
pub mod reader;

pub use loader::{ConfigLoader, FnConfigLoader, MemoryConfigLoader};
pub use reader::{CachedConfigReader, DEFAULT_TIMEOUT_MS, TIMEOUT_OPTION};
