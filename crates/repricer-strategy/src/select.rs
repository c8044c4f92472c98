//! Strategy and competitor selection.

use repricer_core::{CompeteWith, CompetitorOffer, OfferChange, ProductListing, SkipReason};

/// The closed set of pricing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    ChaseBuyBox,
    MaximiseProfit,
    OnlySeller,
}

impl StrategyKind {
    /// Name recorded in the calculated-price record.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChaseBuyBox => "ChaseBuyBox",
            Self::MaximiseProfit => "MaximiseProfit",
            Self::OnlySeller => "OnlySeller",
        }
    }
}

/// Pick the strategy for one event.
///
/// OnlySeller when no rival offer is visible or the listing has at most one
/// offer overall; MaximiseProfit when we hold the buybox on a non-B2B
/// listing (reachable only where the self-competition gate is disabled);
/// ChaseBuyBox otherwise.
pub fn select_strategy(
    change: &OfferChange,
    our_seller: &str,
    listing: &ProductListing,
) -> StrategyKind {
    let no_rivals = change.rival_offers(our_seller).next().is_none();
    if no_rivals || change.total_offers <= 1 {
        return StrategyKind::OnlySeller;
    }
    if change.buybox_winner_id.as_deref() == Some(our_seller) && !listing.is_b2b {
        return StrategyKind::MaximiseProfit;
    }
    StrategyKind::ChaseBuyBox
}

/// Pick the competitor offer the strategy acts on.
///
/// Our own offers are always excluded. Price ties break by seller id
/// (see [`OfferChange::cheapest`]).
pub fn select_competitor<'a>(
    change: &'a OfferChange,
    our_seller: &'a str,
    compete_with: CompeteWith,
) -> Result<&'a CompetitorOffer, SkipReason> {
    match compete_with {
        CompeteWith::LowestPrice => OfferChange::cheapest(change.rival_offers(our_seller))
            .ok_or(SkipReason::NoValidCompetitor),
        CompeteWith::LowestFbaPrice => OfferChange::cheapest(
            change
                .rival_offers(our_seller)
                .filter(|o| {
                    o.fulfillment_channel == repricer_core::FulfillmentChannel::Amazon
                        && o.sub_condition == change.item_condition
                }),
        )
        .ok_or(SkipReason::NoFbaCompetitor),
        CompeteWith::MatchBuybox => change
            .buybox_offer()
            .filter(|o| o.seller_id != our_seller)
            .ok_or(SkipReason::NoValidCompetitor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use repricer_core::{EventSource, FulfillmentChannel, ItemCondition, Price};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

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

    fn listing(is_b2b: bool) -> ProductListing {
        ProductListing {
            listed_price: Some(Price::new(dec!(29.99))),
            min_price: None,
            max_price: None,
            default_price: None,
            strategy_id: Some("2".to_string()),
            item_condition: ItemCondition::New,
            fulfillment_channel: FulfillmentChannel::Merchant,
            status: Default::default(),
            quantity: 5,
            is_b2b,
            b2b_tiers: Vec::new(),
            repricing_paused: false,
            expires_at: None,
        }
    }

    #[test]
    fn test_only_seller_when_no_rivals() {
        let mut c = change(vec![offer("S1", dec!(29.99), false)]);
        c.total_offers = 1;
        assert_eq!(
            select_strategy(&c, "S1", &listing(false)),
            StrategyKind::OnlySeller
        );
    }

    #[test]
    fn test_maximise_profit_when_we_hold_buybox() {
        let c = change(vec![
            offer("S1", dec!(29.99), true),
            offer("S2", dec!(32.00), false),
        ]);
        assert_eq!(
            select_strategy(&c, "S1", &listing(false)),
            StrategyKind::MaximiseProfit
        );
        // B2B listings never maximise; tiers chase instead.
        assert_eq!(
            select_strategy(&c, "S1", &listing(true)),
            StrategyKind::ChaseBuyBox
        );
    }

    #[test]
    fn test_chase_buybox_default() {
        let c = change(vec![
            offer("S2", dec!(26.50), true),
            offer("S3", dec!(27.00), false),
        ]);
        assert_eq!(
            select_strategy(&c, "S1", &listing(false)),
            StrategyKind::ChaseBuyBox
        );
    }

    #[test]
    fn test_competitor_lowest_price_excludes_us() {
        let c = change(vec![
            offer("S1", dec!(20.00), false),
            offer("S2", dec!(26.50), false),
            offer("S3", dec!(26.00), false),
        ]);
        let comp = select_competitor(&c, "S1", CompeteWith::LowestPrice).unwrap();
        assert_eq!(comp.seller_id, "S3");
    }

    #[test]
    fn test_competitor_match_buybox_rejects_own_win() {
        let c = change(vec![
            offer("S1", dec!(28.00), true),
            offer("S2", dec!(29.00), false),
        ]);
        assert_eq!(
            select_competitor(&c, "S1", CompeteWith::MatchBuybox).unwrap_err(),
            SkipReason::NoValidCompetitor
        );
    }

    #[test]
    fn test_competitor_fba_requires_channel() {
        let c = change(vec![offer("S2", dec!(26.50), false)]);
        assert_eq!(
            select_competitor(&c, "S1", CompeteWith::LowestFbaPrice).unwrap_err(),
            SkipReason::NoFbaCompetitor
        );

        let mut fba = offer("S3", dec!(27.50), false);
        fba.fulfillment_channel = FulfillmentChannel::Amazon;
        let c = change(vec![offer("S2", dec!(26.50), false), fba]);
        let comp = select_competitor(&c, "S1", CompeteWith::LowestFbaPrice).unwrap();
        assert_eq!(comp.seller_id, "S3");
    }

    #[test]
    fn test_no_rivals_is_no_valid_competitor() {
        let c = change(vec![offer("S1", dec!(29.99), false)]);
        assert_eq!(
            select_competitor(&c, "S1", CompeteWith::LowestPrice).unwrap_err(),
            SkipReason::NoValidCompetitor
        );
    }
}
