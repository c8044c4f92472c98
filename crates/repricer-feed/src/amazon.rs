//! Amazon SP-API `ANY_OFFER_CHANGED` normalization.
//!
//! Queue messages arrive either as the bare notification or wrapped in an
//! SNS envelope (`{"Type": "Notification", "Message": "<json string>"}`).
//! Numeric amounts are SP-API money objects (`{"Amount": ..., "CurrencyCode": ...}`).

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use repricer_core::{
    CompetitorOffer, EventSource, FulfillmentChannel, ItemCondition, OfferChange, Price,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// SNS envelope around the notification body.
#[derive(Debug, Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Type")]
    envelope_type: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "NotificationType")]
    notification_type: String,
    #[serde(rename = "Payload")]
    payload: Payload,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "OfferChangeTrigger")]
    trigger: Trigger,
    #[serde(rename = "Summary")]
    summary: Option<Summary>,
    #[serde(rename = "Offers", default)]
    offers: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
struct Trigger {
    #[serde(rename = "MarketplaceId")]
    marketplace_id: Option<String>,
    #[serde(rename = "ASIN")]
    asin: Option<String>,
    #[serde(rename = "ItemCondition")]
    item_condition: Option<String>,
    #[serde(rename = "TimeOfOfferChange")]
    time_of_offer_change: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(rename = "NumberOfOffers", default)]
    number_of_offers: Vec<OfferCount>,
    #[serde(rename = "LowestPrices", default)]
    lowest_prices: Vec<SummaryPrice>,
    #[serde(rename = "BuyBoxPrices", default)]
    buybox_prices: Vec<SummaryPrice>,
}

#[derive(Debug, Deserialize)]
struct OfferCount {
    #[serde(rename = "OfferCount")]
    offer_count: u32,
}

#[derive(Debug, Deserialize)]
struct SummaryPrice {
    #[serde(rename = "Condition")]
    condition: Option<String>,
    #[serde(rename = "FulfillmentChannel")]
    fulfillment_channel: Option<String>,
    #[serde(rename = "ListingPrice")]
    listing_price: Option<Money>,
    #[serde(rename = "LandedPrice")]
    landed_price: Option<Money>,
}

impl SummaryPrice {
    fn effective(&self) -> Option<Price> {
        self.landed_price
            .as_ref()
            .or(self.listing_price.as_ref())
            .map(|m| Price::new(m.amount))
    }

    fn matches_condition(&self, condition: ItemCondition) -> bool {
        self.condition
            .as_deref()
            .map(ItemCondition::parse_lossy)
            .is_none_or(|c| c == condition)
    }
}

#[derive(Debug, Deserialize)]
struct Money {
    #[serde(rename = "Amount")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawOffer {
    #[serde(rename = "SellerId")]
    seller_id: Option<String>,
    #[serde(rename = "SubCondition")]
    sub_condition: Option<String>,
    #[serde(rename = "ListingPrice")]
    listing_price: Option<Money>,
    #[serde(rename = "LandedPrice")]
    landed_price: Option<Money>,
    #[serde(rename = "IsBuyBoxWinner", default)]
    is_buybox_winner: bool,
    #[serde(rename = "FulfillmentChannel")]
    fulfillment_channel: Option<String>,
    #[serde(rename = "QuantityTier", alias = "quantityTier")]
    quantity_tier: Option<u32>,
}

/// Marketplace-id to country-code mapping (the subset the repricer serves).
fn marketplace_code(marketplace_id: Option<&str>) -> &'static str {
    match marketplace_id {
        Some("ATVPDKIKX0DER") => "US",
        Some("A2EUQ1WTGCTBG2") => "CA",
        Some("A1AM78C64UM0Y8") => "MX",
        Some("A2Q3Y263D00KWC") => "BR",
        Some("A1F83G8C2ARO7P") => "UK",
        Some("A1PA6795UKMFR9") => "DE",
        Some("A13V1IB3VIYZZH") => "FR",
        Some("A1RKKUPIHCS9HS") => "ES",
        Some("APJ6JRA9NG5V4") => "IT",
        Some("A1805IZSGTT6HS") => "NL",
        Some("A1C3SOZRARQ6R3") => "PL",
        Some("A21TJRUUN4KGV") => "IN",
        Some("A1VC38T7YXB528") => "JP",
        Some("A39IBJ37TRP1C6") => "AU",
        Some("A2VIGQ35RCS4UG") => "AE",
        Some("A19VAU5U5O7RUS") => "SG",
        _ => "US",
    }
}

fn parse_event_time(raw: Option<&str>) -> DateTime<Utc> {
    match raw {
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(_) => {
                warn!(raw = s, "unparseable TimeOfOfferChange, using now");
                Utc::now()
            }
        },
        None => Utc::now(),
    }
}

/// Unwrap an optional SNS envelope and return the notification JSON.
fn unwrap_envelope(body: &str) -> FeedResult<Notification> {
    if let Ok(envelope) = serde_json::from_str::<SnsEnvelope>(body) {
        if envelope.envelope_type.as_deref() == Some("Notification") {
            if let Some(inner) = envelope.message {
                return Ok(serde_json::from_str(&inner)?);
            }
        }
    }
    Ok(serde_json::from_str(body)?)
}

/// Normalize an SQS message body into an [`OfferChange`].
///
/// `our_seller_id` is left unset; queue notifications do not identify the
/// affected seller and the orchestrator resolves ownership via the store.
pub fn normalize_amazon(body: &str) -> FeedResult<OfferChange> {
    let notification = unwrap_envelope(body)?;

    if notification.notification_type != "ANY_OFFER_CHANGED" {
        return Err(FeedError::UnsupportedNotification(
            notification.notification_type,
        ));
    }

    let payload = notification.payload;
    let asin = payload
        .trigger
        .asin
        .filter(|a| !a.is_empty())
        .ok_or(FeedError::MissingField("Payload.OfferChangeTrigger.ASIN"))?;
    if payload.offers.is_empty() {
        return Err(FeedError::EmptyOffers);
    }

    let item_condition = payload
        .trigger
        .item_condition
        .as_deref()
        .map(ItemCondition::parse_lossy)
        .unwrap_or_default();

    let mut competitor_offers = Vec::with_capacity(payload.offers.len());
    for offer in &payload.offers {
        let Some(seller_id) = offer.seller_id.clone().filter(|s| !s.is_empty()) else {
            debug!(%asin, "offer without SellerId dropped");
            continue;
        };
        let Some(listing_price) = offer.listing_price.as_ref() else {
            debug!(%asin, %seller_id, "offer without ListingPrice dropped");
            continue;
        };
        competitor_offers.push(CompetitorOffer {
            seller_id,
            listing_price: Price::new(listing_price.amount),
            landed_price: offer.landed_price.as_ref().map(|m| Price::new(m.amount)),
            fulfillment_channel: offer
                .fulfillment_channel
                .as_deref()
                .map(FulfillmentChannel::parse_lossy)
                .unwrap_or_default(),
            is_buybox_winner: offer.is_buybox_winner,
            sub_condition: offer
                .sub_condition
                .as_deref()
                .map(ItemCondition::parse_lossy)
                .unwrap_or(item_condition),
            quantity_tier: offer.quantity_tier,
        });
    }
    if competitor_offers.is_empty() {
        return Err(FeedError::EmptyOffers);
    }

    let buybox_winner_id = competitor_offers
        .iter()
        .find(|o| o.is_buybox_winner)
        .map(|o| o.seller_id.clone());

    let summary = payload.summary.as_ref();

    let summed: u32 = summary
        .map(|s| s.number_of_offers.iter().map(|c| c.offer_count).sum())
        .unwrap_or(0);
    let total_offers = if summed > 0 {
        summed
    } else {
        competitor_offers.len() as u32
    };

    let mut lowest_prices_by_channel: HashMap<FulfillmentChannel, Price> = HashMap::new();
    if let Some(summary) = summary {
        for entry in &summary.lowest_prices {
            if !entry.matches_condition(item_condition) {
                continue;
            }
            let Some(price) = entry.effective() else {
                continue;
            };
            let channel = entry
                .fulfillment_channel
                .as_deref()
                .map(FulfillmentChannel::parse_lossy)
                .unwrap_or_default();
            lowest_prices_by_channel
                .entry(channel)
                .and_modify(|p| *p = (*p).min(price))
                .or_insert(price);
        }
    }

    let buybox_price = summary.and_then(|s| {
        s.buybox_prices
            .iter()
            .filter(|e| e.matches_condition(item_condition))
            .find_map(|e| e.effective())
    });

    Ok(OfferChange {
        source: EventSource::Amazon,
        asin,
        our_seller_id: None,
        marketplace: marketplace_code(payload.trigger.marketplace_id.as_deref()).to_string(),
        item_condition,
        competitor_offers,
        buybox_winner_id,
        total_offers,
        lowest_prices_by_channel,
        buybox_price,
        event_time: parse_event_time(payload.trigger.time_of_offer_change.as_deref()),
    })
}
