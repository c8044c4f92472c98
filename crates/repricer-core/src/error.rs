//! Error types for repricer-core.

use thiserror::Error;

/// Core validation and decoding errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid listing: {0}")]
    InvalidListing(String),

    #[error("invalid strategy field {field}: {value:?}")]
    InvalidStrategyField { field: String, value: String },

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
