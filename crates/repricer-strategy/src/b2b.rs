//! B2B quantity-tier pricing.
//!
//! Each listing tier competes against the matching competitor tier and is
//! priced independently: a failing tier logs and the remaining tiers still
//! price. The standard price is always computed separately by the engine.

use crate::bounds::{clamp, Bounds};
use repricer_core::{
    B2bCompeteFor, B2bPriceRule, B2bTier, CompetitorOffer, OfferChange, Price, ProductListing,
    SkipReason, Strategy, TierPrice,
};
use tracing::{debug, warn};

/// Price every tier of a B2B listing.
pub fn price_tiers(
    change: &OfferChange,
    our_seller: &str,
    listing: &ProductListing,
    strategy: &Strategy,
) -> Vec<TierPrice> {
    let compete_for = strategy.b2b_compete_for.unwrap_or(B2bCompeteFor::Low);
    let price_rule = strategy.b2b_price_rule.unwrap_or(B2bPriceRule::BeatBy);

    let mut results = Vec::with_capacity(listing.b2b_tiers.len());
    for tier in &listing.b2b_tiers {
        match price_tier(change, our_seller, listing, strategy, tier, compete_for, price_rule) {
            Ok(priced) => results.push(priced),
            Err(reason) => {
                warn!(
                    asin = %change.asin,
                    min_quantity = tier.min_quantity,
                    reason = %reason,
                    "tier pricing skipped"
                );
            }
        }
    }
    results
}

fn price_tier(
    change: &OfferChange,
    our_seller: &str,
    listing: &ProductListing,
    strategy: &Strategy,
    tier: &B2bTier,
    compete_for: B2bCompeteFor,
    price_rule: B2bPriceRule,
) -> Result<TierPrice, SkipReason> {
    let competitor = select_tier_competitor(change, our_seller, tier.min_quantity, compete_for)
        .ok_or(SkipReason::NoValidCompetitor)?;
    let competitor_price = competitor.effective_price();

    let raw = match price_rule {
        B2bPriceRule::Average => Price::midpoint(tier.price, competitor_price),
        B2bPriceRule::BeatBy => (competitor_price + strategy.beat_by).round2(),
    };

    // Tier-local bounds win; the listing-level bounds back them up.
    let bounds = Bounds::new(
        tier.min_price.or(listing.min_price),
        tier.max_price.or(listing.max_price),
    );
    let default_price = tier.default_price.or(listing.default_price);

    let new_price = clamp(
        raw,
        &bounds,
        strategy.min_price_rule,
        strategy.max_price_rule,
        default_price,
        Some(competitor_price),
    )?;

    debug!(
        asin = %change.asin,
        min_quantity = tier.min_quantity,
        competitor = %competitor_price,
        new_price = %new_price,
        "tier priced"
    );

    Ok(TierPrice {
        min_quantity: tier.min_quantity,
        new_price,
        old_price: tier.price,
        competitor_price,
    })
}

/// Find the competitor tier offer for our tier's quantity.
///
/// `Low` takes the largest competitor tier at or below ours, `High` the
/// smallest at or above; among offers at the chosen tier the cheapest wins,
/// ties by seller id.
fn select_tier_competitor<'a>(
    change: &'a OfferChange,
    our_seller: &str,
    min_quantity: u32,
    compete_for: B2bCompeteFor,
) -> Option<&'a CompetitorOffer> {
    let tier_offers = || {
        change
            .competitor_offers
            .iter()
            .filter(|o| o.seller_id != our_seller)
            .filter_map(|o| o.quantity_tier.map(|qt| (qt, o)))
    };

    let target_tier = match compete_for {
        B2bCompeteFor::Low => tier_offers()
            .filter(|(qt, _)| *qt <= min_quantity)
            .map(|(qt, _)| qt)
            .max()?,
        B2bCompeteFor::High => tier_offers()
            .filter(|(qt, _)| *qt >= min_quantity)
            .map(|(qt, _)| qt)
            .min()?,
    };

    OfferChange::cheapest(
        tier_offers()
            .filter(|(qt, _)| *qt == target_tier)
            .map(|(_, o)| o),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use repricer_core::{
        CompeteWith, EventSource, FulfillmentChannel, ItemCondition, ListingStatus, PriceRule,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn tier_offer(seller: &str, quantity: u32, price: Decimal) -> CompetitorOffer {
        CompetitorOffer {
            seller_id: seller.to_string(),
            listing_price: Price::new(price),
            landed_price: None,
            fulfillment_channel: FulfillmentChannel::Merchant,
            is_buybox_winner: false,
            sub_condition: ItemCondition::New,
            quantity_tier: Some(quantity),
        }
    }

    fn tier(quantity: u32, price: Decimal) -> B2bTier {
        B2bTier {
            min_quantity: quantity,
            price: Price::new(price),
            min_price: None,
            max_price: None,
            default_price: None,
        }
    }

    fn b2b_listing() -> ProductListing {
        ProductListing {
            listed_price: Some(Price::new(dec!(26.00))),
            min_price: Some(Price::new(dec!(10.00))),
            max_price: Some(Price::new(dec!(40.00))),
            default_price: None,
            strategy_id: Some("7".to_string()),
            item_condition: ItemCondition::New,
            fulfillment_channel: FulfillmentChannel::Merchant,
            status: ListingStatus::Active,
            quantity: 100,
            is_b2b: true,
            b2b_tiers: vec![tier(5, dec!(24.00)), tier(10, dec!(22.00))],
            repricing_paused: false,
            expires_at: None,
        }
    }

    fn b2b_strategy(rule: B2bPriceRule) -> Strategy {
        Strategy {
            compete_with: CompeteWith::LowestPrice,
            beat_by: Price::new(dec!(-0.10)),
            min_price_rule: PriceRule::JumpToMin,
            max_price_rule: PriceRule::JumpToMax,
            b2b_compete_for: Some(B2bCompeteFor::Low),
            b2b_price_rule: Some(rule),
        }
    }

    fn b2b_change(offers: Vec<CompetitorOffer>) -> OfferChange {
        OfferChange {
            source: EventSource::Amazon,
            asin: "X1".to_string(),
            our_seller_id: Some("S1".to_string()),
            marketplace: "US".to_string(),
            item_condition: ItemCondition::New,
            total_offers: offers.len() as u32,
            competitor_offers: offers,
            buybox_winner_id: None,
            lowest_prices_by_channel: HashMap::new(),
            buybox_price: None,
            event_time: Utc::now(),
        }
    }

    #[test]
    fn test_beat_by_per_tier() {
        let change = b2b_change(vec![
            tier_offer("S2", 5, dec!(24.50)),
            tier_offer("S2", 10, dec!(22.50)),
        ]);
        let results = price_tiers(&change, "S1", &b2b_listing(), &b2b_strategy(B2bPriceRule::BeatBy));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].min_quantity, 5);
        assert_eq!(results[0].new_price, Price::new(dec!(24.40)));
        assert_eq!(results[1].min_quantity, 10);
        assert_eq!(results[1].new_price, Price::new(dec!(22.40)));
    }

    #[test]
    fn test_average_rule() {
        let change = b2b_change(vec![tier_offer("S2", 5, dec!(25.00))]);
        let mut listing = b2b_listing();
        listing.b2b_tiers = vec![tier(5, dec!(24.00))];

        let results = price_tiers(&change, "S1", &listing, &b2b_strategy(B2bPriceRule::Average));
        assert_eq!(results.len(), 1);
        // (24.00 + 25.00) / 2
        assert_eq!(results[0].new_price, Price::new(dec!(24.50)));
    }

    #[test]
    fn test_low_matches_largest_tier_at_or_below() {
        // Our 10-tier competes with the competitor's 8-tier, not the 20-tier.
        let change = b2b_change(vec![
            tier_offer("S2", 8, dec!(23.00)),
            tier_offer("S2", 20, dec!(21.00)),
        ]);
        let mut listing = b2b_listing();
        listing.b2b_tiers = vec![tier(10, dec!(22.00))];

        let results = price_tiers(&change, "S1", &listing, &b2b_strategy(B2bPriceRule::BeatBy));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].competitor_price, Price::new(dec!(23.00)));
    }

    #[test]
    fn test_high_matches_smallest_tier_at_or_above() {
        let change = b2b_change(vec![
            tier_offer("S2", 8, dec!(23.00)),
            tier_offer("S2", 20, dec!(21.00)),
        ]);
        let mut listing = b2b_listing();
        listing.b2b_tiers = vec![tier(10, dec!(22.00))];
        let mut strategy = b2b_strategy(B2bPriceRule::BeatBy);
        strategy.b2b_compete_for = Some(B2bCompeteFor::High);

        let results = price_tiers(&change, "S1", &listing, &strategy);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].competitor_price, Price::new(dec!(21.00)));
    }

    #[test]
    fn test_own_tier_offers_excluded() {
        let change = b2b_change(vec![
            tier_offer("S1", 5, dec!(20.00)),
            tier_offer("S2", 5, dec!(24.50)),
        ]);
        let mut listing = b2b_listing();
        listing.b2b_tiers = vec![tier(5, dec!(24.00))];

        let results = price_tiers(&change, "S1", &listing, &b2b_strategy(B2bPriceRule::BeatBy));
        assert_eq!(results[0].competitor_price, Price::new(dec!(24.50)));
    }

    #[test]
    fn test_failing_tier_does_not_stop_the_rest() {
        // No competitor tier at or below 5, so the 5-tier fails; the
        // 10-tier still prices.
        let change = b2b_change(vec![tier_offer("S2", 10, dec!(22.50))]);
        let results = price_tiers(&change, "S1", &b2b_listing(), &b2b_strategy(B2bPriceRule::BeatBy));

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].min_quantity, 10);
    }

    #[test]
    fn test_tier_local_bounds_override() {
        let change = b2b_change(vec![tier_offer("S2", 5, dec!(24.50))]);
        let mut listing = b2b_listing();
        listing.b2b_tiers = vec![B2bTier {
            min_quantity: 5,
            price: Price::new(dec!(24.00)),
            min_price: Some(Price::new(dec!(24.45))),
            max_price: Some(Price::new(dec!(30.00))),
            default_price: None,
        }];

        // 24.40 < tier min 24.45 -> jump to tier min.
        let results = price_tiers(&change, "S1", &listing, &b2b_strategy(B2bPriceRule::BeatBy));
        assert_eq!(results[0].new_price, Price::new(dec!(24.45)));
    }
}
