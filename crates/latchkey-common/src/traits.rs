//! Component traits shared across latchkey crates

use crate::params::ConfigParams;

/// A component that can be reconfigured at runtime from [`ConfigParams`].
///
/// Options that are missing or unparseable leave the current setting untouched.
pub trait Reconfigurable: Send + Sync {
    fn configure(&self, config: &ConfigParams);
}
