//! Latchkey Common - Shared types and utilities
//!
//! This crate provides what the lock coordinator and the cached config reader
//! have in common:
//! - Error type and error codes
//! - `ConfigParams` key/value configuration with sections
//! - The `Reconfigurable` trait
//! - Millisecond deadline helpers
//! - Logging initialisation

pub mod error;
pub mod logging;
pub mod params;
pub mod time;
pub mod traits;

// Re-exports for convenience
pub use error::{LatchkeyError, Result};
pub use params::ConfigParams;
pub use time::{Deadline, millis};
pub use traits::Reconfigurable;
