//! Store error types and their retry classification.

use thiserror::Error;

/// Errors surfaced by the store gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("decode error for {key}: {message}")]
    Decode { key: String, message: String },

    #[error("invalid record at {key}: {message}")]
    InvalidRecord { key: String, message: String },

    #[error("store circuit open")]
    CircuitOpen,
}

impl StoreError {
    /// Transient errors are worth retrying (nack, let the source redeliver);
    /// structural errors never heal on retry and are skipped with a log.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Redis(e) => !matches!(
                e.kind(),
                redis::ErrorKind::TypeError | redis::ErrorKind::ClientError
            ),
            Self::CircuitOpen => true,
            Self::Decode { .. } | Self::InvalidRecord { .. } => false,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
