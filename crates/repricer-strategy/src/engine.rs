//! Strategy dispatch and calculated-price assembly.

use crate::b2b;
use crate::bounds::{clamp, Bounds};
use crate::select::{select_competitor, select_strategy, StrategyKind};
use chrono::Utc;
use repricer_core::{
    CalculatedPrice, OfferChange, Price, ProductListing, SkipReason, Strategy,
};
use tracing::debug;

/// Compute the new price for one accepted event.
///
/// Called only after the decision gates pass. Returns the record to
/// persist, or the business reason no price was produced. Never touches
/// the store.
pub fn apply(
    change: &OfferChange,
    our_seller: &str,
    listing: &ProductListing,
    strategy: &Strategy,
    strategy_id: &str,
) -> Result<CalculatedPrice, SkipReason> {
    let kind = select_strategy(change, our_seller, listing);
    let old_price = listing.listed_price.unwrap_or(Price::ZERO);

    let (raw, competitor_price) = match kind {
        StrategyKind::OnlySeller => (only_seller_raw(listing)?, None),
        StrategyKind::ChaseBuyBox => {
            let competitor = select_competitor(change, our_seller, strategy.compete_with)?;
            let price = competitor.effective_price();
            ((price + strategy.beat_by).round2(), Some(price))
        }
        StrategyKind::MaximiseProfit => {
            let competitor = select_competitor(change, our_seller, strategy.compete_with)?;
            let price = competitor.effective_price();
            // Matching the competitor only makes sense upward; a cheaper
            // competitor means there is no profit to reclaim.
            if price <= old_price {
                debug!(
                    asin = %change.asin,
                    competitor = %price,
                    listed = %old_price,
                    "competitor not above our price"
                );
                return Err(SkipReason::AlreadyCheaper);
            }
            (price.round2(), Some(price))
        }
    };

    let bounds = Bounds::new(listing.min_price, listing.max_price);
    let new_price = clamp(
        raw,
        &bounds,
        strategy.min_price_rule,
        strategy.max_price_rule,
        listing.default_price,
        competitor_price,
    )?;

    let tiers = if listing.is_b2b && !listing.b2b_tiers.is_empty() {
        b2b::price_tiers(change, our_seller, listing, strategy)
    } else {
        Vec::new()
    };

    Ok(CalculatedPrice {
        asin: change.asin.clone(),
        new_price,
        old_price,
        strategy_used: kind.name().to_string(),
        strategy_id: strategy_id.to_string(),
        competitor_price,
        calculated_at: Utc::now(),
        price_changed: CalculatedPrice::differs(new_price, old_price),
        processing_time_ms: 0,
        tiers,
    })
}

/// Raw price for the only-seller strategy: default price when set, else the
/// midpoint of the bounds.
fn only_seller_raw(listing: &ProductListing) -> Result<Price, SkipReason> {
    if let Some(default) = listing.default_price {
        return Ok(default.round2());
    }
    match (listing.min_price, listing.max_price) {
        (Some(min), Some(max)) => Ok(Price::midpoint(min, max)),
        _ => Err(SkipReason::NoDefault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repricer_core::{
        CompeteWith, CompetitorOffer, EventSource, FulfillmentChannel, ItemCondition,
        ListingStatus, PriceRule,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

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

    fn strategy(compete_with: CompeteWith, beat_by: Decimal) -> Strategy {
        Strategy {
            compete_with,
            beat_by: Price::new(beat_by),
            min_price_rule: PriceRule::JumpToMin,
            max_price_rule: PriceRule::JumpToMax,
            b2b_compete_for: None,
            b2b_price_rule: None,
        }
    }

    fn offer(seller: &str, price: Decimal, buybox: bool) -> CompetitorOffer {
        CompetitorOffer {
            seller_id: seller.to_string(),
            listing_price: Price::new(price),
            landed_price: None,
            fulfillment_channel: FulfillmentChannel::Merchant,
            is_buybox_winner: buybox,
            sub_condition: ItemCondition::New,
            quantity_tier: None,
        }
    }

    fn change(offers: Vec<CompetitorOffer>) -> OfferChange {
        let buybox_winner_id = offers
            .iter()
            .find(|o| o.is_buybox_winner)
            .map(|o| o.seller_id.clone());
        OfferChange {
            source: EventSource::Amazon,
            asin: "X1".to_string(),
            our_seller_id: Some("S1".to_string()),
            marketplace: "US".to_string(),
            item_condition: ItemCondition::New,
            total_offers: offers.len() as u32,
            competitor_offers: offers,
            buybox_winner_id,
            lowest_prices_by_channel: HashMap::new(),
            buybox_price: None,
            event_time: Utc::now(),
        }
    }

    #[test]
    fn test_chase_buybox_undercut() {
        // Buybox winner S2 at 26.50, beat_by -0.01.
        let c = change(vec![
            offer("S2", dec!(26.50), true),
            offer("S3", dec!(27.00), false),
        ]);
        let s = strategy(CompeteWith::MatchBuybox, dec!(-0.01));

        let result = apply(&c, "S1", &listing(), &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(26.49)));
        assert_eq!(result.old_price, Price::new(dec!(29.99)));
        assert_eq!(result.strategy_used, "ChaseBuyBox");
        assert_eq!(result.competitor_price, Some(Price::new(dec!(26.50))));
        assert!(result.price_changed);
        assert!(result.tiers.is_empty());
    }

    #[test]
    fn test_chase_lowest_clamps_to_min() {
        // Lowest competitor at 10.00 with beat_by -0.05 -> 9.95 < min 25.00.
        let c = change(vec![
            offer("S2", dec!(10.00), false),
            offer("S3", dec!(30.00), true),
        ]);
        let s = strategy(CompeteWith::LowestPrice, dec!(-0.05));
        let mut l = listing();
        l.listed_price = Some(Price::new(dec!(30.00)));
        l.min_price = Some(Price::new(dec!(25.00)));
        l.max_price = Some(Price::new(dec!(40.00)));

        let result = apply(&c, "S1", &l, &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(25.00)));
    }

    #[test]
    fn test_only_seller_uses_default() {
        let mut c = change(vec![offer("S1", dec!(29.99), false)]);
        c.total_offers = 1;
        let s = strategy(CompeteWith::MatchBuybox, dec!(-0.01));
        let mut l = listing();
        l.default_price = Some(Price::new(dec!(24.00)));

        let result = apply(&c, "S1", &l, &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(24.00)));
        assert_eq!(result.strategy_used, "OnlySeller");
        assert_eq!(result.competitor_price, None);
    }

    #[test]
    fn test_only_seller_falls_back_to_midpoint() {
        let mut c = change(vec![offer("S1", dec!(12.00), false)]);
        c.total_offers = 1;
        let s = strategy(CompeteWith::MatchBuybox, dec!(-0.01));
        let mut l = listing();
        l.listed_price = Some(Price::new(dec!(12.00)));
        l.min_price = Some(Price::new(dec!(10.00)));
        l.max_price = Some(Price::new(dec!(20.00)));

        let result = apply(&c, "S1", &l, &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(15.00)));
        assert_eq!(result.competitor_price, None);
        assert!(result.price_changed);
    }

    #[test]
    fn test_only_seller_without_inputs_skips() {
        let mut c = change(vec![offer("S1", dec!(12.00), false)]);
        c.total_offers = 1;
        let s = strategy(CompeteWith::MatchBuybox, dec!(-0.01));
        let mut l = listing();
        l.min_price = None;
        l.max_price = None;

        assert_eq!(
            apply(&c, "S1", &l, &s, "2").unwrap_err(),
            SkipReason::NoDefault
        );
    }

    #[test]
    fn test_maximise_profit_skips_when_competitor_cheaper() {
        // We hold the buybox at 30.00; the rival lowest sits at 25.00, so
        // there is no headroom to reclaim.
        let c = change(vec![
            offer("S1", dec!(30.00), true),
            offer("S2", dec!(25.00), false),
        ]);
        let s = strategy(CompeteWith::LowestPrice, dec!(0));
        let mut l = listing();
        l.listed_price = Some(Price::new(dec!(30.00)));

        assert_eq!(
            apply(&c, "S1", &l, &s, "2").unwrap_err(),
            SkipReason::AlreadyCheaper
        );
    }

    #[test]
    fn test_maximise_profit_matches_higher_competitor() {
        let c = change(vec![
            offer("S1", dec!(30.00), true),
            offer("S2", dec!(34.00), false),
        ]);
        let s = strategy(CompeteWith::LowestPrice, dec!(0));
        let mut l = listing();
        l.listed_price = Some(Price::new(dec!(30.00)));

        let result = apply(&c, "S1", &l, &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(34.00)));
        assert_eq!(result.strategy_used, "MaximiseProfit");
    }

    #[test]
    fn test_price_unchanged_flag() {
        // Competitor at 30.00 with beat_by 0 matches our current price.
        let c = change(vec![
            offer("S2", dec!(29.99), true),
            offer("S3", dec!(31.00), false),
        ]);
        let s = strategy(CompeteWith::MatchBuybox, dec!(0));

        let result = apply(&c, "S1", &listing(), &s, "2").unwrap();
        assert_eq!(result.new_price, Price::new(dec!(29.99)));
        assert!(!result.price_changed);
    }

    #[test]
    fn test_result_rounded_to_two_decimals() {
        let c = change(vec![
            offer("S2", dec!(26.515), true),
            offer("S3", dec!(27.00), false),
        ]);
        let s = strategy(CompeteWith::MatchBuybox, dec!(-0.001));

        let result = apply(&c, "S1", &listing(), &s, "2").unwrap();
        // 26.515 - 0.001 = 26.514 -> 26.51
        assert_eq!(result.new_price, Price::new(dec!(26.51)));
    }
}
