//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] repricer_store::StoreError),

    #[error("intake error: {0}")]
    Intake(#[from] repricer_intake::IntakeError),

    #[error("server error: {0}")]
    Server(#[from] repricer_server::ServerError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] repricer_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
