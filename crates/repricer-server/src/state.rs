//! Shared state for the HTTP handlers.

use repricer_intake::RawEvent;
use repricer_store::{CircuitBreaker, PriceStore};
use repricer_telemetry::PipelineStats;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Producer side of the internal event stream. `try_send` so the
    /// webhook can answer 503 instead of blocking.
    pub events: mpsc::Sender<RawEvent>,
    pub store: Arc<dyn PriceStore>,
    pub breaker: Arc<CircuitBreaker>,
    pub stats: Arc<PipelineStats>,
    /// Shared secret required in `x-webhook-secret` when set.
    pub webhook_secret: Option<String>,
}

/// Health report served by `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub store: &'static str,
    pub circuit: &'static str,
    pub queue_depth: usize,
}

impl AppState {
    /// Probe the components and build the health report.
    pub async fn health(&self) -> HealthReport {
        let store_ok = matches!(
            tokio::time::timeout(Duration::from_secs(2), self.store.ping()).await,
            Ok(Ok(()))
        );
        let circuit = self.breaker.state();

        let healthy = store_ok && circuit != repricer_store::BreakerState::Open;
        HealthReport {
            status: if healthy { "healthy" } else { "degraded" },
            store: if store_ok { "up" } else { "down" },
            circuit: circuit.as_str(),
            queue_depth: self.events.max_capacity() - self.events.capacity(),
        }
    }
}
