//! Ordered eligibility gates.
//!
//! # Gate order
//!
//! 1. Listing exists
//! 2. Listing active and not paused
//! 3. Has stock
//! 4. Strategy resolvable
//! 5. Bounds leave room to reprice
//! 6. Not self-competing (buybox / sole seller / already lowest)
//!
//! Self-competition is the defining gate: acting on a price signal we
//! ourselves generated would walk our own price down.

use repricer_core::{
    CompeteWith, OfferChange, ProductListing, RepricingDecision, SkipReason, Strategy,
};
use tracing::{debug, trace};

/// Run the gates for one event.
///
/// `listing` is the result of the store read (`None` = not found, expired
/// included); `strategy` is the result of resolving the listing's
/// `strategy_id`, `None` when the id was unset or the record missing.
pub fn decide(
    change: &OfferChange,
    our_seller: &str,
    listing: Option<&ProductListing>,
    strategy: Option<&Strategy>,
) -> RepricingDecision {
    // Gate 1: listing exists.
    let Some(listing) = listing else {
        trace!(asin = %change.asin, our_seller, "listing not found");
        return RepricingDecision::skip(SkipReason::ProductNotFound);
    };

    // Gate 2: listing active and repricing not paused.
    if !listing.status.is_active() {
        return RepricingDecision::skip(SkipReason::Inactive);
    }
    if listing.repricing_paused {
        return RepricingDecision::skip(SkipReason::Paused);
    }

    // Gate 3: in stock.
    if listing.quantity <= 0 {
        return RepricingDecision::skip(SkipReason::OutOfStock);
    }

    // Gate 4: strategy resolvable.
    if listing.strategy_id.is_none() {
        return RepricingDecision::skip(SkipReason::StrategyMissing);
    }
    let Some(strategy) = strategy else {
        return RepricingDecision::skip(SkipReason::StrategyMissing);
    };

    // Gate 5: bounds leave room. Equal bounds pin the price; there is
    // nothing to compute.
    if let (Some(min), Some(max)) = (listing.min_price, listing.max_price) {
        if min == max {
            return RepricingDecision::skip(SkipReason::NoPriceRoom);
        }
        if min > max {
            // The decoder rejects this, but a listing constructed in-process
            // still hits the gate.
            return RepricingDecision::skip(SkipReason::NoPriceRoom);
        }
    }

    // Gate 6: self-competition.
    if let Some(winner) = change.buybox_winner_id.as_deref() {
        if winner == our_seller {
            debug!(asin = %change.asin, our_seller, "we hold the buybox");
            return RepricingDecision::skip(SkipReason::SelfCompetingBuybox);
        }
    }

    if change.all_offers_ours(our_seller) {
        // Every visible offer is ours. With nobody else reported on the
        // listing the only-seller strategy prices it; a larger summary count
        // means unseen competitors exist and a competitive strategy would
        // chase our own offer.
        if change.total_offers > 1 {
            debug!(
                asin = %change.asin,
                total_offers = change.total_offers,
                "only our offers visible among a larger offer count"
            );
            return RepricingDecision::skip(SkipReason::SoleSellerTrivial);
        }
    } else {
        match strategy.compete_with {
            CompeteWith::LowestPrice if change.we_hold_lowest(our_seller) => {
                return RepricingDecision::skip(SkipReason::SelfCompetingLowest);
            }
            CompeteWith::LowestFbaPrice if change.we_hold_lowest_fba(our_seller) => {
                return RepricingDecision::skip(SkipReason::SelfCompetingFbaLowest);
            }
            _ => {}
        }
    }

    RepricingDecision::reprice()
}
