//! Walmart buy-box-changed webhook normalization.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use repricer_core::{
    CompetitorOffer, EventSource, FulfillmentChannel, ItemCondition, OfferChange, Price,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "eventType")]
    event_type: Option<String>,
    #[serde(rename = "itemId")]
    item_id: Option<String>,
    #[serde(rename = "sellerId")]
    seller_id: Option<String>,
    #[serde(rename = "marketplace")]
    marketplace: Option<String>,
    timestamp: Option<String>,
    #[serde(rename = "currentBuyboxPrice")]
    current_buybox_price: Option<Decimal>,
    #[serde(rename = "currentBuyboxWinner")]
    current_buybox_winner: Option<String>,
    #[serde(default)]
    offers: Vec<WebhookOffer>,
}

#[derive(Debug, Deserialize)]
struct WebhookOffer {
    #[serde(rename = "sellerId")]
    seller_id: Option<String>,
    price: Option<Decimal>,
    condition: Option<String>,
}

fn parse_event_time(raw: Option<&str>) -> DateTime<Utc> {
    match raw {
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(_) => {
                warn!(raw = s, "unparseable webhook timestamp, using now");
                Utc::now()
            }
        },
        None => Utc::now(),
    }
}

/// Normalize a Walmart webhook body into an [`OfferChange`].
///
/// Unlike the queue source, the webhook identifies the affected seller, so
/// `our_seller_id` is populated here.
pub fn normalize_walmart(body: &str) -> FeedResult<OfferChange> {
    let payload: WebhookPayload = serde_json::from_str(body)?;

    match payload.event_type.as_deref() {
        Some("buybox_changed") => {}
        Some(other) => return Err(FeedError::UnsupportedNotification(other.to_string())),
        None => return Err(FeedError::MissingField("eventType")),
    }

    let asin = payload
        .item_id
        .filter(|v| !v.is_empty())
        .ok_or(FeedError::MissingField("itemId"))?;
    let our_seller_id = payload
        .seller_id
        .filter(|v| !v.is_empty())
        .ok_or(FeedError::MissingField("sellerId"))?;
    if payload.offers.is_empty() {
        return Err(FeedError::EmptyOffers);
    }

    let buybox_winner_id = payload.current_buybox_winner.filter(|v| !v.is_empty());

    let mut competitor_offers = Vec::with_capacity(payload.offers.len());
    for offer in &payload.offers {
        let Some(seller_id) = offer.seller_id.clone().filter(|s| !s.is_empty()) else {
            debug!(%asin, "webhook offer without sellerId dropped");
            continue;
        };
        let Some(price) = offer.price else {
            debug!(%asin, %seller_id, "webhook offer without price dropped");
            continue;
        };
        let is_buybox_winner = buybox_winner_id.as_deref() == Some(seller_id.as_str());
        competitor_offers.push(CompetitorOffer {
            seller_id,
            listing_price: Price::new(price),
            landed_price: None,
            fulfillment_channel: FulfillmentChannel::Merchant,
            is_buybox_winner,
            sub_condition: offer
                .condition
                .as_deref()
                .map(ItemCondition::parse_lossy)
                .unwrap_or_default(),
            quantity_tier: None,
        });
    }
    if competitor_offers.is_empty() {
        return Err(FeedError::EmptyOffers);
    }

    Ok(OfferChange {
        source: EventSource::Walmart,
        total_offers: competitor_offers.len() as u32,
        asin,
        our_seller_id: Some(our_seller_id),
        marketplace: payload.marketplace.unwrap_or_else(|| "US".to_string()),
        item_condition: ItemCondition::New,
        competitor_offers,
        buybox_winner_id,
        lowest_prices_by_channel: HashMap::new(),
        buybox_price: payload.current_buybox_price.map(Price::new),
        event_time: parse_event_time(payload.timestamp.as_deref()),
    })
}
