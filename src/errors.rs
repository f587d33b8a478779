//! Error types for the resource pool

use thiserror::Error;

/// Boxed error type used for failures reported by caller-supplied callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PoolError {
    /// The allocator was called and reported a failure. Never retried by the pool.
    #[error("Resource allocation failed: {0}")]
    AllocationFailed(#[source] BoxError),

    /// No resource was available and none could be allocated in time
    #[error("Pool exhausted - no resource available")]
    PoolExhausted,

    #[error("Invalid pool configuration: {0}")]
    Configuration(String),
}

impl PoolError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        PoolError::Configuration(message.into())
    }

    /// Whether this error means the pool had nothing to hand out
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::PoolExhausted)
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_allocation_failed_keeps_source() {
        let err = PoolError::AllocationFailed("connection refused".into());

        assert_eq!(err.to_string(), "Resource allocation failed: connection refused");
        assert_eq!(err.source().map(|s| s.to_string()), Some("connection refused".to_string()));
        assert!(!err.is_exhausted());
    }

    #[test]
    fn test_exhausted() {
        assert!(PoolError::PoolExhausted.is_exhausted());
        assert!(!PoolError::configuration("bad").is_exhausted());
    }
}
