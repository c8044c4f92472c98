//! Pipeline outcome sum types.
//!
//! No exceptions cross component boundaries: the decision engine returns a
//! `RepricingDecision`, the strategy engine returns price-or-skip, and the
//! orchestrator folds everything into an `EventOutcome` that the intake
//! adapters map to ack/redeliver.

use crate::calculated::CalculatedPrice;
use crate::price::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an event was skipped instead of producing a price write.
///
/// Skips are business outcomes, not errors; the source message is acked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProductNotFound,
    Inactive,
    Paused,
    OutOfStock,
    StrategyMissing,
    NoPriceRoom,
    SelfCompetingBuybox,
    SoleSellerTrivial,
    SelfCompetingLowest,
    SelfCompetingFbaLowest,
    NoValidCompetitor,
    NoFbaCompetitor,
    AlreadyCheaper,
    NoDefault,
    BelowMinNoAction,
    AboveMaxNoAction,
    /// A clamping rule produced a price still outside the bounds.
    BoundsViolation {
        calculated: Price,
        min: Option<Price>,
        max: Option<Price>,
    },
    UnknownOwner,
    /// Input malformation: the payload never became an offer change. The
    /// record is dropped with a warning and the source message acked.
    MalformedPayload,
    DeadlineExceeded,
    /// Unexpected computation failure; logged with detail at the call site.
    Internal,
}

impl SkipReason {
    /// Stable snake_case label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductNotFound => "product_not_found",
            Self::Inactive => "inactive",
            Self::Paused => "paused",
            Self::OutOfStock => "out_of_stock",
            Self::StrategyMissing => "strategy_missing",
            Self::NoPriceRoom => "no_price_room",
            Self::SelfCompetingBuybox => "self_competing_buybox",
            Self::SoleSellerTrivial => "sole_seller_trivial",
            Self::SelfCompetingLowest => "self_competing_lowest",
            Self::SelfCompetingFbaLowest => "self_competing_fba_lowest",
            Self::NoValidCompetitor => "no_valid_competitor",
            Self::NoFbaCompetitor => "no_fba_competitor",
            Self::AlreadyCheaper => "already_cheaper",
            Self::NoDefault => "no_default",
            Self::BelowMinNoAction => "below_min_no_action",
            Self::AboveMaxNoAction => "above_max_no_action",
            Self::BoundsViolation { .. } => "bounds_violation",
            Self::UnknownOwner => "unknown_owner",
            Self::MalformedPayload => "malformed_payload",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision engine's verdict on one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepricingDecision {
    pub should_reprice: bool,
    /// "ok" when eligible, otherwise the skip reason label.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipReason>,
}

impl RepricingDecision {
    pub fn reprice() -> Self {
        Self {
            should_reprice: true,
            reason: "ok".to_string(),
            skip: None,
        }
    }

    pub fn skip(reason: SkipReason) -> Self {
        Self {
            should_reprice: false,
            reason: reason.as_str().to_string(),
            skip: Some(reason),
        }
    }
}

/// Terminal outcome of one event, reported back to the intake adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Pipeline completed; the price write happened iff `price_changed`.
    Ok {
        price_changed: bool,
        calculated: Option<CalculatedPrice>,
    },
    /// Business skip; the source message is acked.
    Skip(SkipReason),
    /// Transient failure; the source message is left for redelivery.
    Retry(String),
}

impl EventOutcome {
    /// Whether the source message should be deleted. Retries leave the
    /// message for the visibility timeout, as does a deadline-exceeded
    /// skip: the worker abandoned the event mid-flight, so the source
    /// redelivers it naturally.
    pub fn should_ack(&self) -> bool {
        !matches!(
            self,
            Self::Retry(_) | Self::Skip(SkipReason::DeadlineExceeded)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::Skip(_) => "skip",
            Self::Retry(_) => "retry",
        }
    }
}
