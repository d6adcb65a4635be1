//! Error types shared by the lock coordinator and the cached config reader
//!
//! Only the lock timeout is a dedicated error kind. Anything raised by a lock
//! backend or a config loader is carried through unchanged as
//! [`LatchkeyError::Backend`], so callers can tell infrastructure failure apart
//! from contention.

/// Stable error code for a lock acquisition that ran out of time
pub const LOCK_TIMEOUT: &str = "LOCK_TIMEOUT";

/// Stable error code for a failure raised by a backend or loader
pub const BACKEND_FAILURE: &str = "BACKEND_FAILURE";

/// Stable error code for an unusable configuration source
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

#[derive(thiserror::Error, Debug)]
pub enum LatchkeyError {
    #[error("acquiring lock {key} failed on timeout")]
    LockTimeout {
        key: String,
        correlation_id: Option<String>,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LatchkeyError {
    pub fn lock_timeout(correlation_id: Option<&str>, key: &str) -> Self {
        LatchkeyError::LockTimeout {
            key: key.to_string(),
            correlation_id: correlation_id.map(str::to_string),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LatchkeyError::LockTimeout { .. } => LOCK_TIMEOUT,
            LatchkeyError::Backend(_) => BACKEND_FAILURE,
            LatchkeyError::Config(_) => CONFIG_ERROR,
        }
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, LatchkeyError::LockTimeout { .. })
    }

    /// Correlation id attached to the error, if the error kind carries one
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            LatchkeyError::LockTimeout { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for LatchkeyError {
    fn from(value: config::ConfigError) -> Self {
        LatchkeyError::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LatchkeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct StoreDown;

    #[test]
    fn test_lock_timeout_display_and_code() {
        let err = LatchkeyError::lock_timeout(Some("req-1"), "job-1");
        assert_eq!(err.to_string(), "acquiring lock job-1 failed on timeout");
        assert_eq!(err.code(), LOCK_TIMEOUT);
        assert_eq!(err.correlation_id(), Some("req-1"));
        assert!(err.is_lock_timeout());
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: LatchkeyError = anyhow::Error::new(StoreDown).into();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.code(), BACKEND_FAILURE);
        assert!(!err.is_lock_timeout());
        assert!(err.correlation_id().is_none());

        match err {
            LatchkeyError::Backend(inner) => assert!(inner.downcast_ref::<StoreDown>().is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_error_code() {
        let err = LatchkeyError::Config("bad source".to_string());
        assert_eq!(err.to_string(), "configuration error: bad source");
        assert_eq!(err.code(), CONFIG_ERROR);
    }
}
