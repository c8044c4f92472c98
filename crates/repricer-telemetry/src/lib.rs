//! Telemetry: structured logging and prometheus metrics.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use stats::{PipelineStats, StatsSnapshot};
