//! Application assembly and lifecycle.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use repricer_intake::{QueueConsumer, SqsClient, SqsConfig};
use repricer_server::AppState;
use repricer_store::{CircuitBreaker, CircuitBreakerConfig, PriceStore, RedisStore};
use repricer_telemetry::PipelineStats;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// The assembled application.
pub struct Application {
    config: AppConfig,
    store: Arc<dyn PriceStore>,
    breaker: Arc<CircuitBreaker>,
    stats: Arc<PipelineStats>,
}

impl Application {
    /// Connect the shared handles.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let store: Arc<dyn PriceStore> = Arc::new(
            RedisStore::connect(&config.redis_url, config.calculated_price_ttl).await?,
        );
        Ok(Self {
            config,
            store,
            breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            stats: Arc::new(PipelineStats::default()),
        })
    }

    /// Run until SIGINT, then shut down gracefully: stop intake, drain
    /// in-flight events, stop the server.
    pub async fn run(self) -> AppResult<()> {
        let (event_tx, event_rx) = mpsc::channel(self.config.event_queue_bound);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // HTTP surface: webhook intake plus health/stats/management.
        let state = AppState {
            events: event_tx.clone(),
            store: Arc::clone(&self.store),
            breaker: Arc::clone(&self.breaker),
            stats: Arc::clone(&self.stats),
            webhook_secret: self.config.webhook_secret.clone(),
        };
        let server = tokio::spawn(repricer_server::serve(
            self.config.http_bind,
            state,
            shutdown_rx.clone(),
        ));

        // Queue intake.
        let mut consumer_handles = Vec::new();
        if self.config.sqs_queue_urls.is_empty() {
            warn!("no SQS queues configured, queue intake disabled");
        } else {
            let client = Arc::new(SqsClient::new(SqsConfig {
                endpoint: self.config.sqs_endpoint.clone(),
                batch_size: self.config.sqs_batch_size,
                wait_time_secs: self.config.sqs_wait_time_secs,
                visibility_timeout_secs: self.config.sqs_visibility_timeout_secs,
            })?);
            let consumer = QueueConsumer::new(
                client,
                self.config.sqs_queue_urls.clone(),
                event_tx.clone(),
            );
            consumer_handles = consumer.spawn(shutdown_rx.clone());
        }

        // The orchestrator owns the consumer side of the stream.
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.breaker),
            Arc::clone(&self.stats),
            OrchestratorConfig {
                max_in_flight: self.config.max_in_flight,
                event_deadline: self.config.event_deadline,
                drain_deadline: self.config.drain_deadline,
            },
        ));
        let pipeline = tokio::spawn(orchestrator.run(event_rx, shutdown_rx));

        // Drop our producer handle so the stream closes once the adapters
        // stop.
        drop(event_tx);

        info!("repricer running, press ctrl-c to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "signal listener failed, shutting down");
        }

        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);

        for handle in consumer_handles {
            let _ = handle.await;
        }
        let _ = pipeline.await;
        match server.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "server task panicked"),
        }

        info!("shutdown complete");
        Ok(())
    }
}
