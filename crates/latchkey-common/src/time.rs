// Millisecond timing helpers on the tokio monotonic clock
// Deadlines all use tokio's Instant so paused-time tests can drive them

use std::time::Duration;

use tokio::time::Instant;

/// Convert a signed millisecond count into a duration, clamping negatives to zero
pub fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// A point on the monotonic clock after which an operation gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout_ms` from now; zero or negative timeouts are already expired
    pub fn after(timeout_ms: i64) -> Self {
        Self::after_from(Instant::now(), timeout_ms)
    }

    pub fn after_from(start: Instant, timeout_ms: i64) -> Self {
        Self {
            at: start + millis(timeout_ms),
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}
