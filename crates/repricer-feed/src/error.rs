//! Normalization error types.
//!
//! Every variant is a fail-fast condition: the event is dropped with a
//! warning and the source message is acked, never retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported notification type: {0}")]
    UnsupportedNotification(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("empty offers list")]
    EmptyOffers,
}

pub type FeedResult<T> = Result<T, FeedError>;
