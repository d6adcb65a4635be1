//! Console logging setup for services and test binaries embedding latchkey.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the directive the
//! caller passes (for example `"info,latchkey_lock=debug"`).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global fmt subscriber.
///
/// Returns `false` when a global subscriber was already installed, so calling
/// this from several tests is harmless.
pub fn init(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Same as [`init`] but writes through the test harness capture
pub fn init_for_tests() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_for_tests();
        assert!(!init("info"));
    }
}
