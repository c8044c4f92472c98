//! Calculated price records written for downstream feed builders.

use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-tier repricing result for B2B listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPrice {
    pub min_quantity: u32,
    pub new_price: Price,
    pub old_price: Price,
    pub competitor_price: Price,
}

/// The repricing result persisted under `CALCULATED_PRICES:<seller>`.
///
/// Overwrites any prior value for the same (seller, sku); the later
/// wall-clock write prevails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedPrice {
    pub asin: String,
    pub new_price: Price,
    pub old_price: Price,
    /// Name of the concrete strategy that produced the price.
    pub strategy_used: String,
    pub strategy_id: String,
    /// The competitor price the strategy acted on; absent for the
    /// only-seller strategy.
    pub competitor_price: Option<Price>,
    pub calculated_at: DateTime<Utc>,
    pub price_changed: bool,
    /// End-to-end pipeline latency for the event that produced this record.
    #[serde(default)]
    pub processing_time_ms: u64,
    /// B2B tier results; empty for standard listings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierPrice>,
}

impl CalculatedPrice {
    /// Whether `new` differs from `old` at the two-decimal granularity the
    /// marketplace accepts.
    pub fn differs(new: Price, old: Price) -> bool {
        new.round2() != old.round2()
    }
}
