//! The canonical offer-change event.
//!
//! Both intake sources normalize into `OfferChange`; everything downstream
//! of the normalizer works on this record and never sees a raw payload.

use crate::listing::{FulfillmentChannel, ItemCondition};
use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which intake adapter produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Amazon SQS ANY_OFFER_CHANGED notification.
    Amazon,
    /// Walmart buy-box-changed webhook.
    Walmart,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Walmart => "walmart",
        }
    }
}

/// A single offer visible on the listing, ours included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorOffer {
    pub seller_id: String,
    pub listing_price: Price,
    /// Price including shipping; preferred over the listing price when set.
    #[serde(default)]
    pub landed_price: Option<Price>,
    #[serde(default)]
    pub fulfillment_channel: FulfillmentChannel,
    #[serde(default)]
    pub is_buybox_winner: bool,
    #[serde(default)]
    pub sub_condition: ItemCondition,
    /// B2B quantity tier this offer belongs to; `None` for standard offers.
    #[serde(default)]
    pub quantity_tier: Option<u32>,
}

impl CompetitorOffer {
    /// The price the engine compares on: landed when present, else listing.
    #[inline]
    pub fn effective_price(&self) -> Price {
        self.landed_price.unwrap_or(self.listing_price)
    }

    /// Standard (non-tier) offer.
    #[inline]
    pub fn is_standard(&self) -> bool {
        self.quantity_tier.is_none()
    }
}

/// Canonical offer-change record produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferChange {
    pub source: EventSource,
    pub asin: String,
    /// Our seller on this listing. Webhook events carry it; queue events are
    /// resolved against the store before the decision step.
    pub our_seller_id: Option<String>,
    pub marketplace: String,
    pub item_condition: ItemCondition,
    pub competitor_offers: Vec<CompetitorOffer>,
    pub buybox_winner_id: Option<String>,
    pub total_offers: u32,
    pub lowest_prices_by_channel: HashMap<FulfillmentChannel, Price>,
    pub buybox_price: Option<Price>,
    pub event_time: DateTime<Utc>,
}

impl OfferChange {
    /// Standard offers not owned by `our_seller`.
    pub fn rival_offers<'a>(
        &'a self,
        our_seller: &'a str,
    ) -> impl Iterator<Item = &'a CompetitorOffer> {
        self.competitor_offers
            .iter()
            .filter(move |o| o.seller_id != our_seller && o.is_standard())
    }

    /// Whether every visible offer belongs to `our_seller`.
    pub fn all_offers_ours(&self, our_seller: &str) -> bool {
        !self.competitor_offers.is_empty()
            && self
                .competitor_offers
                .iter()
                .all(|o| o.seller_id == our_seller)
    }

    /// Cheapest offer among `offers`, breaking price ties by seller id so
    /// repeated evaluation of the same event picks the same competitor.
    pub fn cheapest<'a, I>(offers: I) -> Option<&'a CompetitorOffer>
    where
        I: Iterator<Item = &'a CompetitorOffer>,
    {
        offers.min_by(|a, b| {
            a.effective_price()
                .cmp(&b.effective_price())
                .then_with(|| a.seller_id.cmp(&b.seller_id))
        })
    }

    /// Cheapest standard offer across all sellers, ours included.
    pub fn lowest_offer(&self) -> Option<&CompetitorOffer> {
        Self::cheapest(self.competitor_offers.iter().filter(|o| o.is_standard()))
    }

    /// Cheapest marketplace-fulfilled offer matching the event condition,
    /// across all sellers.
    pub fn lowest_fba_offer(&self) -> Option<&CompetitorOffer> {
        Self::cheapest(self.competitor_offers.iter().filter(|o| {
            o.is_standard()
                && o.fulfillment_channel == FulfillmentChannel::Amazon
                && o.sub_condition == self.item_condition
        }))
    }

    /// The offer flagged as the buybox winner, if any.
    pub fn buybox_offer(&self) -> Option<&CompetitorOffer> {
        self.competitor_offers
            .iter()
            .find(|o| o.is_buybox_winner && o.is_standard())
    }

    /// Whether we currently hold the lowest visible price.
    pub fn we_hold_lowest(&self, our_seller: &str) -> bool {
        self.lowest_offer()
            .is_some_and(|o| o.seller_id == our_seller)
    }

    /// Whether we hold the lowest marketplace-fulfilled price.
    pub fn we_hold_lowest_fba(&self, our_seller: &str) -> bool {
        self.lowest_fba_offer()
            .is_some_and(|o| o.seller_id == our_seller)
    }

    /// Seller ids present in the offers list, deduplicated, in order of
    /// first appearance. Used for owner resolution against the store.
    pub fn offer_seller_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for offer in &self.competitor_offers {
            if !seen.iter().any(|s| s == &offer.seller_id) {
                seen.push(offer.seller_id.clone());
            }
        }
        seen
    }
}
