//! Error types for lock acquisition and store access

/// Failure talking to the lease store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store protocol error: {0}")]
    Protocol(String),

    #[error("store returned error: {0}")]
    Server(String),

    #[error("store connection closed")]
    ConnectionClosed,

    #[error("store request timeout")]
    Timeout,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error returned to the caller of an acquisition.
///
/// Release never produces one of these; see [`crate::ReleaseOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("maximum retries hit while acquiring lock for: {key}")]
    MaxRetriesExceeded { key: String },
}

impl LockError {
    /// The lock key for retry exhaustion, `None` for store failures.
    pub fn key(&self) -> Option<&str> {
        match self {
            LockError::MaxRetriesExceeded { key } => Some(key),
            LockError::Store(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
