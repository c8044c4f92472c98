//! The event orchestrator.
//!
//! Runs the four-step pipeline per event — normalize, resolve & read,
//! decide, calculate & persist — under a bounded worker pool with a
//! per-event deadline, and reports the terminal outcome back to the intake
//! adapter for ack/redelivery.

use repricer_core::{EventOutcome, EventSource, SkipReason};
use repricer_decision::decide;
use repricer_feed::{normalize_amazon, normalize_walmart};
use repricer_intake::RawEvent;
use repricer_store::{BreakerState, CircuitBreaker, PriceStore, StoreResult};
use repricer_telemetry::{metrics, PipelineStats};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum events processed concurrently.
    pub max_in_flight: usize,
    /// Per-event processing deadline.
    pub event_deadline: Duration,
    /// How long shutdown waits for in-flight events.
    pub drain_deadline: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 100,
            event_deadline: Duration::from_secs(30),
            drain_deadline: Duration::from_secs(30),
        }
    }
}

/// Binds the pipeline stages together at throughput.
pub struct Orchestrator {
    store: Arc<dyn PriceStore>,
    breaker: Arc<CircuitBreaker>,
    stats: Arc<PipelineStats>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn PriceStore>,
        breaker: Arc<CircuitBreaker>,
        stats: Arc<PipelineStats>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            breaker,
            stats,
            config,
        }
    }

    /// Consume the internal event stream until shutdown, then drain.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<RawEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            max_in_flight = self.config.max_in_flight,
            deadline_secs = self.config.event_deadline.as_secs(),
            "orchestrator started"
        );
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut workers = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Hold a permit before pulling an event so a saturated pool
            // backpressures the adapters through the bounded stream.
            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => continue,
            };

            let event = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = shutdown.changed() => {
                    drop(permit);
                    continue;
                }
            };

            // Reap finished workers without blocking.
            while workers.try_join_next().is_some() {}

            let this = Arc::clone(&self);
            workers.spawn(async move {
                let outcome = this.handle_event(&event).await;
                event.ack.settle(&outcome).await;
                drop(permit);
            });
        }

        info!(in_flight = workers.len(), "draining in-flight events");
        let drained = tokio::time::timeout(self.config.drain_deadline, async {
            while workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("drain deadline exceeded, abandoning remaining events");
            workers.shutdown().await;
        }
        info!("orchestrator stopped");
    }

    /// Process one event end-to-end under the deadline.
    pub async fn handle_event(&self, event: &RawEvent) -> EventOutcome {
        let started = Instant::now();
        self.stats.record_received();
        metrics::EVENTS_RECEIVED_TOTAL
            .with_label_values(&[event.source.as_str()])
            .inc();
        metrics::EVENTS_IN_FLIGHT.inc();

        let outcome =
            match tokio::time::timeout(self.config.event_deadline, self.process(event, started))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.stats.record_deadline_exceeded();
                    warn!(source = event.source.as_str(), "event deadline exceeded");
                    EventOutcome::Skip(SkipReason::DeadlineExceeded)
                }
            };

        metrics::EVENTS_IN_FLIGHT.dec();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        metrics::EVENTS_PROCESSED_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        metrics::PROCESSING_DURATION_MS
            .with_label_values(&[event.source.as_str()])
            .observe(elapsed_ms as f64);

        match &outcome {
            EventOutcome::Ok {
                price_changed,
                calculated,
            } => {
                self.stats.record_ok(*price_changed, elapsed_ms);
                if *price_changed {
                    metrics::PRICES_WRITTEN_TOTAL.inc();
                }
                if let Some(calc) = calculated {
                    info!(
                        asin = %calc.asin,
                        old_price = %calc.old_price,
                        new_price = %calc.new_price,
                        strategy = %calc.strategy_used,
                        price_changed = *price_changed,
                        processing_time_ms = elapsed_ms,
                        "event repriced"
                    );
                }
            }
            EventOutcome::Skip(reason) => {
                metrics::SKIPS_TOTAL
                    .with_label_values(&[reason.as_str()])
                    .inc();
                if matches!(reason, SkipReason::MalformedPayload) {
                    self.stats.record_dropped();
                    metrics::EVENTS_DROPPED_TOTAL
                        .with_label_values(&[event.source.as_str()])
                        .inc();
                } else {
                    self.stats.record_skip(elapsed_ms);
                }
                debug!(
                    source = event.source.as_str(),
                    reason = reason.as_str(),
                    processing_time_ms = elapsed_ms,
                    "event skipped"
                );
            }
            EventOutcome::Retry(reason) => {
                self.stats.record_retry();
                warn!(
                    source = event.source.as_str(),
                    reason = %reason, "event left for redelivery"
                );
            }
        }

        outcome
    }

    async fn process(&self, event: &RawEvent, started: Instant) -> EventOutcome {
        self.process_inner(event, started)
            .await
            .unwrap_or_else(|terminal| terminal)
    }

    async fn process_inner(
        &self,
        event: &RawEvent,
        started: Instant,
    ) -> Result<EventOutcome, EventOutcome> {
        // Step 1: extract the canonical offer change.
        let change = match event.source {
            EventSource::Amazon => normalize_amazon(&event.body),
            EventSource::Walmart => normalize_walmart(&event.body),
        };
        let change = match change {
            Ok(change) => change,
            Err(e) => {
                warn!(source = event.source.as_str(), error = %e, "payload dropped");
                return Ok(EventOutcome::Skip(SkipReason::MalformedPayload));
            }
        };

        // Step 2: resolve the owning (seller, sku) and read the listing.
        let (seller_id, sku) = match &change.our_seller_id {
            Some(seller) => {
                // The webhook names the seller; we still need their SKU.
                let candidates = [seller.clone()];
                match self
                    .store_call(self.store.resolve_owner(&change.asin, &candidates))
                    .await?
                {
                    Some((resolved, sku)) if resolved == *seller => (resolved, sku),
                    _ => {
                        debug!(asin = %change.asin, %seller, "seller does not list this item");
                        return Ok(EventOutcome::Skip(SkipReason::ProductNotFound));
                    }
                }
            }
            None => {
                let candidates = change.offer_seller_ids();
                match self
                    .store_call(self.store.resolve_owner(&change.asin, &candidates))
                    .await?
                {
                    Some(owner) => owner,
                    None => {
                        debug!(asin = %change.asin, "no known seller lists this asin");
                        return Ok(EventOutcome::Skip(SkipReason::UnknownOwner));
                    }
                }
            }
        };

        let listing = self
            .store_call(self.store.get_listing(&change.asin, &seller_id, &sku))
            .await?;
        let strategy = match listing.as_ref().and_then(|l| l.strategy_id.clone()) {
            Some(strategy_id) => self
                .store_call(self.store.get_strategy(&strategy_id))
                .await?,
            None => None,
        };

        // Step 3: decide.
        let decision = decide(&change, &seller_id, listing.as_ref(), strategy.as_ref());
        if !decision.should_reprice {
            return Ok(EventOutcome::Skip(
                decision.skip.unwrap_or(SkipReason::Internal),
            ));
        }
        // The gates only accept with both present.
        let (Some(listing), Some(strategy)) = (listing, strategy) else {
            return Ok(EventOutcome::Skip(SkipReason::Internal));
        };
        let strategy_id = listing.strategy_id.clone().unwrap_or_default();

        // Step 4: calculate and persist.
        let mut calculated =
            match repricer_strategy::apply(&change, &seller_id, &listing, &strategy, &strategy_id) {
                Ok(calculated) => calculated,
                Err(reason) => {
                    if let SkipReason::BoundsViolation { calculated, min, max } = &reason {
                        warn!(
                            asin = %change.asin,
                            seller_id = %seller_id,
                            calculated = %calculated,
                            min = ?min.map(|p| p.to_string()),
                            max = ?max.map(|p| p.to_string()),
                            strategy = %strategy.compete_with,
                            "price bounds violation"
                        );
                    }
                    return Ok(EventOutcome::Skip(reason));
                }
            };
        calculated.processing_time_ms = started.elapsed().as_millis() as u64;

        if calculated.price_changed {
            self.store_call(
                self.store
                    .put_calculated_price(&seller_id, &sku, &calculated),
            )
            .await?;
        } else {
            debug!(asin = %change.asin, %seller_id, price = %calculated.new_price, "price unchanged, not writing");
        }

        Ok(EventOutcome::Ok {
            price_changed: calculated.price_changed,
            calculated: Some(calculated),
        })
    }

    /// Run one store operation through the circuit breaker and classify its
    /// failure: transient errors retry, structural errors skip.
    async fn store_call<T, F>(&self, operation: F) -> Result<T, EventOutcome>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if !self.breaker.allow() {
            self.update_circuit_gauge();
            return Err(EventOutcome::Retry("store circuit open".to_string()));
        }

        let result = operation.await;
        match result {
            Ok(value) => {
                self.breaker.record_success();
                self.update_circuit_gauge();
                Ok(value)
            }
            Err(e) if e.is_transient() => {
                self.breaker.record_failure();
                self.update_circuit_gauge();
                metrics::STORE_ERRORS_TOTAL
                    .with_label_values(&["transient"])
                    .inc();
                Err(EventOutcome::Retry(e.to_string()))
            }
            Err(e) => {
                metrics::STORE_ERRORS_TOTAL
                    .with_label_values(&["structural"])
                    .inc();
                warn!(error = %e, "structural store error");
                Err(EventOutcome::Skip(SkipReason::Internal))
            }
        }
    }

    fn update_circuit_gauge(&self) {
        metrics::STORE_CIRCUIT_STATE.set(match self.breaker.state() {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        });
    }
}
