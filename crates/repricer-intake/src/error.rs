//! Intake error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("queue api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed queue response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal event stream closed")]
    StreamClosed,
}

pub type IntakeResult<T> = Result<T, IntakeError>;
