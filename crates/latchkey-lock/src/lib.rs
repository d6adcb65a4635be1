//! Latchkey Lock - TTL-bounded named locks
//!
//! This crate provides:
//! - `LockBackend`, the capability a lock store implements
//! - `LockCoordinator` with probe, bounded-retry acquire and release
//! - `MemoryLockBackend` and `NullLockBackend` for in-process use

pub mod backend;
pub mod coordinator;
pub mod memory;

pub use backend::{LockBackend, NullLockBackend};
pub use coordinator::{DEFAULT_RETRY_TIMEOUT_MS, LockCoordinator, RETRY_TIMEOUT_OPTION};
pub use memory::{MemoryLockBackend, PURGE_EVERY_ATTEMPTS};
