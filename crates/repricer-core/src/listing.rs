//! Product listing records.
//!
//! A `ProductListing` is the seller's catalog entry for one (asin, seller,
//! sku) triple, decoded from the JSON stored in the key-value store. The
//! decoder is the validation boundary: a listing that violates its price
//! invariants never enters the pipeline.

use crate::error::{CoreError, Result};
use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing lifecycle status as reported by the catalog sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl ListingStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Who fulfills the order: the marketplace's own logistics or the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FulfillmentChannel {
    Amazon,
    #[default]
    Merchant,
}

impl FulfillmentChannel {
    /// Lossy parse; anything that is not the marketplace channel is treated
    /// as merchant-fulfilled.
    pub fn parse_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("amazon") {
            Self::Amazon
        } else {
            Self::Merchant
        }
    }
}

impl fmt::Display for FulfillmentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amazon => write!(f, "AMAZON"),
            Self::Merchant => write!(f, "MERCHANT"),
        }
    }
}

/// Item condition. Feeds disagree on casing ("New" vs "new"), so parsing is
/// case-insensitive and lossy with `New` as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemCondition {
    #[default]
    New,
    Used,
    Refurbished,
    Collectible,
    Club,
}

impl ItemCondition {
    pub fn parse_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "used" => Self::Used,
            "refurbished" => Self::Refurbished,
            "collectible" => Self::Collectible,
            "club" => Self::Club,
            _ => Self::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Refurbished => "refurbished",
            Self::Collectible => "collectible",
            Self::Club => "club",
        }
    }
}

impl From<String> for ItemCondition {
    fn from(s: String) -> Self {
        Self::parse_lossy(&s)
    }
}

impl From<ItemCondition> for String {
    fn from(c: ItemCondition) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business-buyer price point attached to a minimum purchase quantity.
///
/// Tier-local bounds override the listing-level bounds when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B2bTier {
    pub min_quantity: u32,
    /// Current listed price for this tier.
    #[serde(alias = "listed_price")]
    pub price: Price,
    #[serde(default, alias = "min")]
    pub min_price: Option<Price>,
    #[serde(default, alias = "max")]
    pub max_price: Option<Price>,
    #[serde(default)]
    pub default_price: Option<Price>,
}

/// A seller's catalog entry for one (asin, seller, sku).
///
/// Identity lives in the store key, not in the record; the decoder ignores
/// any identity fields older writers embedded in the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(default)]
    pub listed_price: Option<Price>,
    #[serde(default, alias = "min")]
    pub min_price: Option<Price>,
    #[serde(default, alias = "max")]
    pub max_price: Option<Price>,
    #[serde(default)]
    pub default_price: Option<Price>,
    #[serde(default)]
    pub strategy_id: Option<String>,
    #[serde(default)]
    pub item_condition: ItemCondition,
    #[serde(default)]
    pub fulfillment_channel: FulfillmentChannel,
    #[serde(default)]
    pub status: ListingStatus,
    /// On-hand quantity; 0 means out of stock.
    #[serde(default, alias = "inventory_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub is_b2b: bool,
    #[serde(default)]
    pub b2b_tiers: Vec<B2bTier>,
    #[serde(default)]
    pub repricing_paused: bool,
    /// Application-level expiry; a listing past this instant is treated as
    /// absent even if the store key has not expired yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ProductListing {
    /// Check the record invariants the rest of the pipeline relies on.
    ///
    /// Violations are structural: the listing is refused at the decode
    /// boundary rather than producing a nonsensical price downstream.
    pub fn validate(&self) -> Result<()> {
        for (name, price) in [
            ("listed_price", self.listed_price),
            ("min_price", self.min_price),
            ("max_price", self.max_price),
            ("default_price", self.default_price),
        ] {
            if let Some(p) = price {
                if p.is_negative() {
                    return Err(CoreError::InvalidListing(format!("{name} is negative: {p}")));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(CoreError::InvalidListing(format!(
                    "min_price {min} > max_price {max}"
                )));
            }
            for (name, price) in [
                ("listed_price", self.listed_price),
                ("default_price", self.default_price),
            ] {
                if let Some(p) = price {
                    if p < min || p > max {
                        return Err(CoreError::InvalidListing(format!(
                            "{name} {p} outside bounds [{min}, {max}]"
                        )));
                    }
                }
            }
        }

        let mut prev_quantity: Option<u32> = None;
        for tier in &self.b2b_tiers {
            if let Some(prev) = prev_quantity {
                if tier.min_quantity <= prev {
                    return Err(CoreError::InvalidListing(format!(
                        "b2b tiers not strictly increasing at min_quantity {}",
                        tier.min_quantity
                    )));
                }
            }
            prev_quantity = Some(tier.min_quantity);

            if let (Some(min), Some(max)) = (tier.min_price, tier.max_price) {
                if min > max {
                    return Err(CoreError::InvalidListing(format!(
                        "tier {} min_price {min} > max_price {max}",
                        tier.min_quantity
                    )));
                }
            }
        }

        Ok(())
    }

    /// Whether this listing has expired at the application level.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing() -> ProductListing {
        ProductListing {
            listed_price: Some(Price::new(dec!(29.99))),
            min_price: Some(Price::new(dec!(20.00))),
            max_price: Some(Price::new(dec!(50.00))),
            default_price: None,
            strategy_id: Some("2".to_string()),
            item_condition: ItemCondition::New,
            fulfillment_channel: FulfillmentChannel::Merchant,
            status: ListingStatus::Active,
            quantity: 5,
            is_b2b: false,
            b2b_tiers: Vec::new(),
            repricing_paused: false,
            expires_at: None,
        }
    }

    #[test]
    fn test_valid_listing_passes() {
        assert!(listing().validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut l = listing();
        l.min_price = Some(Price::new(dec!(60.00)));
        assert!(l.validate().is_err());
    }

    #[test]
    fn test_listed_outside_bounds_rejected() {
        let mut l = listing();
        l.listed_price = Some(Price::new(dec!(55.00)));
        assert!(l.validate().is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut l = listing();
        l.default_price = Some(Price::new(dec!(-1.00)));
        assert!(l.validate().is_err());
    }

    #[test]
    fn test_tiers_must_strictly_increase() {
        let mut l = listing();
        l.is_b2b = true;
        l.b2b_tiers = vec![
            B2bTier {
                min_quantity: 5,
                price: Price::new(dec!(24.00)),
                min_price: None,
                max_price: None,
                default_price: None,
            },
            B2bTier {
                min_quantity: 5,
                price: Price::new(dec!(22.00)),
                min_price: None,
                max_price: None,
                default_price: None,
            },
        ];
        assert!(l.validate().is_err());
    }

    #[test]
    fn test_decode_with_aliases() {
        let json = r#"{
            "listed_price": "29.99",
            "min": "20.00",
            "max": "50.00",
            "strategy_id": "2",
            "status": "Active",
            "inventory_quantity": 5,
            "item_condition": "New",
            "fulfillment_channel": "AMAZON"
        }"#;
        let l: ProductListing = serde_json::from_str(json).unwrap();
        assert_eq!(l.min_price, Some(Price::new(dec!(20.00))));
        assert_eq!(l.quantity, 5);
        assert_eq!(l.fulfillment_channel, FulfillmentChannel::Amazon);
        assert_eq!(l.item_condition, ItemCondition::New);
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_unknown_status_decodes() {
        let json = r#"{"status": "Suppressed"}"#;
        let l: ProductListing = serde_json::from_str(json).unwrap();
        assert_eq!(l.status, ListingStatus::Unknown);
        assert!(!l.status.is_active());
    }

    #[test]
    fn test_expiry() {
        let mut l = listing();
        assert!(!l.is_expired(Utc::now()));
        l.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(l.is_expired(Utc::now()));
    }
}
