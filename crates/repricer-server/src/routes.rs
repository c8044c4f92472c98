//! Route handlers.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use repricer_core::{CalculatedPrice, Price};
use repricer_intake::RawEvent;
use repricer_telemetry::metrics;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// Build the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .route("/stats/reset", post(reset_stats))
        .route("/metrics", get(get_metrics))
        .route("/walmart/webhook", post(walmart_webhook))
        .route(
            "/listings/:asin/:seller_id/:sku/reset-price",
            post(reset_price),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "repricer",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    let report = state.health().await;
    let status = if report.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn get_stats(State(state): State<AppState>) -> Json<repricer_telemetry::StatsSnapshot> {
    Json(state.stats.snapshot())
}

async fn reset_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.stats.reset();
    info!("pipeline statistics reset");
    Json(json!({"message": "statistics reset"}))
}

async fn get_metrics() -> Response {
    match repricer_telemetry::metrics::render() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            warn!(error = %e, "metrics render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "encode error").into_response()
        }
    }
}

/// Walmart buy-box-changed webhook.
///
/// Validates the payload shape syntactically, enqueues it, and answers
/// immediately; business parsing happens in the pipeline. Duplicate
/// deliveries are fine, the calculated-price write is idempotent on
/// (seller, sku).
async fn walmart_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(expected) = &state.webhook_secret {
        let presented = headers
            .get("x-webhook-secret")
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            metrics::WEBHOOK_REJECTED_TOTAL
                .with_label_values(&["unauthorized"])
                .inc();
            return (StatusCode::UNAUTHORIZED, "invalid webhook secret").into_response();
        }
    }

    // Syntactic validation only: JSON object with the identifying fields.
    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => {
            metrics::WEBHOOK_REJECTED_TOTAL
                .with_label_values(&["malformed"])
                .inc();
            return (StatusCode::BAD_REQUEST, "malformed JSON").into_response();
        }
    };
    for field in ["itemId", "sellerId"] {
        if parsed.get(field).and_then(|v| v.as_str()).is_none_or(str::is_empty) {
            metrics::WEBHOOK_REJECTED_TOTAL
                .with_label_values(&["malformed"])
                .inc();
            return (
                StatusCode::BAD_REQUEST,
                format!("missing required field: {field}"),
            )
                .into_response();
        }
    }

    match state.events.try_send(RawEvent::from_webhook(body)) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))).into_response(),
        Err(TrySendError::Full(_)) => {
            metrics::WEBHOOK_REJECTED_TOTAL
                .with_label_values(&["backpressure"])
                .inc();
            (StatusCode::SERVICE_UNAVAILABLE, "event stream full").into_response()
        }
        Err(TrySendError::Closed(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResetPriceBody {
    price: Option<Price>,
}

/// Management reset: write a calculated price directly, skipping strategy
/// math. Used by operators to push a listing back to its default price.
async fn reset_price(
    State(state): State<AppState>,
    Path((asin, seller_id, sku)): Path<(String, String, String)>,
    body: Option<Json<ResetPriceBody>>,
) -> Response {
    let listing = match state.store.get_listing(&asin, &seller_id, &sku).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return (StatusCode::NOT_FOUND, "listing not found").into_response(),
        Err(e) => {
            warn!(%asin, %seller_id, error = %e, "reset-price store read failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response();
        }
    };

    let requested = body.and_then(|Json(b)| b.price);
    let target = requested
        .or(listing.default_price)
        .or(match (listing.min_price, listing.max_price) {
            (Some(min), Some(max)) => Some(Price::midpoint(min, max)),
            _ => None,
        });
    let Some(new_price) = target else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "no price supplied and listing has no default or bounds",
        )
            .into_response();
    };

    let new_price = new_price.round2();
    let old_price = listing.listed_price.unwrap_or(Price::ZERO);
    let record = CalculatedPrice {
        asin: asin.clone(),
        new_price,
        old_price,
        strategy_used: "ManualReset".to_string(),
        strategy_id: listing.strategy_id.clone().unwrap_or_default(),
        competitor_price: None,
        calculated_at: Utc::now(),
        price_changed: CalculatedPrice::differs(new_price, old_price),
        processing_time_ms: 0,
        tiers: Vec::new(),
    };

    match state
        .store
        .put_calculated_price(&seller_id, &sku, &record)
        .await
    {
        Ok(()) => {
            info!(%asin, %seller_id, %sku, %new_price, "manual price reset written");
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            warn!(%asin, %seller_id, error = %e, "reset-price store write failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repricer_core::{ItemCondition, ProductListing};
    use repricer_store::{CircuitBreaker, CircuitBreakerConfig, MemoryStore};
    use repricer_telemetry::PipelineStats;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn state(capacity: usize) -> (AppState, mpsc::Receiver<RawEvent>, Arc<MemoryStore>) {
        let (tx, rx) = mpsc::channel(capacity);
        let store = Arc::new(MemoryStore::default());
        let state = AppState {
            events: tx,
            store: store.clone(),
            breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            stats: Arc::new(PipelineStats::default()),
            webhook_secret: None,
        };
        (state, rx, store)
    }

    const WEBHOOK: &str = r#"{
        "eventType": "buybox_changed",
        "itemId": "W100",
        "sellerId": "S1",
        "offers": [{"sellerId": "S2", "price": 26.50}]
    }"#;

    #[tokio::test]
    async fn test_webhook_accepts_and_enqueues() {
        let (state, mut rx, _) = state(8);
        let response =
            walmart_webhook(State(state), HeaderMap::new(), WEBHOOK.to_string()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, repricer_core::EventSource::Walmart);
        assert!(event.body.contains("W100"));
    }

    #[tokio::test]
    async fn test_webhook_malformed_json() {
        let (state, _rx, _) = state(8);
        let response =
            walmart_webhook(State(state), HeaderMap::new(), "{nope".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_missing_item_id() {
        let (state, _rx, _) = state(8);
        let body = r#"{"eventType": "buybox_changed", "sellerId": "S1"}"#;
        let response = walmart_webhook(State(state), HeaderMap::new(), body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_backpressure_503() {
        let (state, _rx, _) = state(1);
        let first =
            walmart_webhook(State(state.clone()), HeaderMap::new(), WEBHOOK.to_string()).await;
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        // Stream full: reject instead of blocking the response.
        let second =
            walmart_webhook(State(state), HeaderMap::new(), WEBHOOK.to_string()).await;
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_webhook_secret_enforced() {
        let (mut state, _rx, _) = state(8);
        state.webhook_secret = Some("sesame".to_string());

        let response = walmart_webhook(
            State(state.clone()),
            HeaderMap::new(),
            WEBHOOK.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert("x-webhook-secret", "sesame".parse().unwrap());
        let response = walmart_webhook(State(state), headers, WEBHOOK.to_string()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_reset_price_uses_default() {
        let (state, _rx, store) = state(8);
        let listing = ProductListing {
            listed_price: Some(Price::new(dec!(29.99))),
            min_price: Some(Price::new(dec!(20.00))),
            max_price: Some(Price::new(dec!(50.00))),
            default_price: Some(Price::new(dec!(27.00))),
            strategy_id: Some("2".to_string()),
            item_condition: ItemCondition::New,
            fulfillment_channel: Default::default(),
            status: Default::default(),
            quantity: 5,
            is_b2b: false,
            b2b_tiers: Vec::new(),
            repricing_paused: false,
            expires_at: None,
        };
        store.put_listing("X1", "S1", "K1", &listing);

        let response = reset_price(
            State(state),
            Path(("X1".to_string(), "S1".to_string(), "K1".to_string())),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let written = store.get_calculated_price("S1", "K1").unwrap();
        assert_eq!(written.new_price, Price::new(dec!(27.00)));
        assert_eq!(written.strategy_used, "ManualReset");
        assert!(written.price_changed);
    }

    #[tokio::test]
    async fn test_reset_price_missing_listing_404() {
        let (state, _rx, _) = state(8);
        let response = reset_price(
            State(state),
            Path(("ZZ".to_string(), "S1".to_string(), "K1".to_string())),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
