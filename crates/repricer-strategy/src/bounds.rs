//! Bounds clamping.
//!
//! A pure function from (raw price, bounds, rules, default, competitor) to
//! final-price-or-skip. The raw price triggers the listing's min or max
//! rule when it falls outside the bounds; whatever a rule produces is
//! re-validated, so a rule can never smuggle an out-of-bounds price into
//! the store.

use repricer_core::{Price, PriceRule, SkipReason};
use tracing::warn;

/// Effective bounds for one price computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bounds {
    pub min: Option<Price>,
    pub max: Option<Price>,
}

impl Bounds {
    pub fn new(min: Option<Price>, max: Option<Price>) -> Self {
        Self { min, max }
    }

    /// Whether `price` satisfies both configured bounds.
    pub fn contains(&self, price: Price) -> bool {
        if self.min.is_some_and(|min| price < min) {
            return false;
        }
        if self.max.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    fn violation(&self, calculated: Price) -> SkipReason {
        SkipReason::BoundsViolation {
            calculated,
            min: self.min,
            max: self.max,
        }
    }
}

/// Side of the bounds a rule fires on; decides the do-nothing reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    BelowMin,
    AboveMax,
}

/// Clamp `raw` into `bounds`, applying the configured rule when it falls
/// outside. Returns the final price rounded to two decimals.
pub fn clamp(
    raw: Price,
    bounds: &Bounds,
    min_rule: PriceRule,
    max_rule: PriceRule,
    default_price: Option<Price>,
    competitor_price: Option<Price>,
) -> Result<Price, SkipReason> {
    let raw = raw.round2();

    let adjusted = if bounds.min.is_some_and(|min| raw < min) {
        apply_rule(Side::BelowMin, min_rule, bounds, default_price, competitor_price)?
    } else if bounds.max.is_some_and(|max| raw > max) {
        apply_rule(Side::AboveMax, max_rule, bounds, default_price, competitor_price)?
    } else {
        raw
    };

    let finalized = adjusted.round2();
    if !bounds.contains(finalized) || finalized.is_negative() {
        warn!(
            calculated = %finalized,
            min = ?bounds.min.map(|p| p.to_string()),
            max = ?bounds.max.map(|p| p.to_string()),
            "clamping rule produced an out-of-bounds price"
        );
        return Err(bounds.violation(finalized));
    }
    Ok(finalized)
}

fn apply_rule(
    side: Side,
    rule: PriceRule,
    bounds: &Bounds,
    default_price: Option<Price>,
    competitor_price: Option<Price>,
) -> Result<Price, SkipReason> {
    match rule {
        PriceRule::JumpToMin => bounds.min.ok_or(bounds.violation(Price::ZERO)),
        PriceRule::JumpToMax => bounds.max.ok_or(bounds.violation(Price::ZERO)),
        PriceRule::JumpToAvg => match (bounds.min, bounds.max) {
            (Some(min), Some(max)) => Ok(Price::midpoint(min, max)),
            _ => Err(bounds.violation(Price::ZERO)),
        },
        PriceRule::DefaultPrice => default_price.ok_or(SkipReason::NoDefault),
        PriceRule::MatchCompetitor => competitor_price.ok_or(SkipReason::NoValidCompetitor),
        PriceRule::DoNothing => Err(match side {
            Side::BelowMin => SkipReason::BelowMinNoAction,
            Side::AboveMax => SkipReason::AboveMaxNoAction,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bounds(min: &str, max: &str) -> Bounds {
        Bounds::new(
            Some(min.parse().expect("min")),
            Some(max.parse().expect("max")),
        )
    }

    #[test]
    fn test_in_bounds_passes_through() {
        let out = clamp(
            Price::new(dec!(26.49)),
            &bounds("20.00", "50.00"),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(26.49)));
    }

    #[test]
    fn test_below_min_jumps_to_min() {
        // Lowest competitor at 10.00 with beat_by -0.05 lands at 9.95,
        // below the 25.00 floor.
        let out = clamp(
            Price::new(dec!(9.95)),
            &bounds("25.00", "40.00"),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(25.00)));
    }

    #[test]
    fn test_above_max_jumps_to_max() {
        let out = clamp(
            Price::new(dec!(55.00)),
            &bounds("20.00", "50.00"),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(50.00)));
    }

    #[test]
    fn test_jump_to_avg() {
        let out = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::JumpToAvg,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(25.00)));
    }

    #[test]
    fn test_default_price_rule() {
        let out = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::DefaultPrice,
            PriceRule::JumpToMax,
            Some(Price::new(dec!(22.00))),
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(22.00)));

        let err = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::DefaultPrice,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, SkipReason::NoDefault);
    }

    #[test]
    fn test_match_competitor_rule_revalidates() {
        // Competitor is itself outside the bounds: rule fires, result fails
        // re-validation.
        let err = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::MatchCompetitor,
            PriceRule::JumpToMax,
            None,
            Some(Price::new(dec!(10.00))),
        )
        .unwrap_err();
        assert!(matches!(err, SkipReason::BoundsViolation { .. }));

        let ok = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::MatchCompetitor,
            PriceRule::JumpToMax,
            None,
            Some(Price::new(dec!(21.00))),
        )
        .unwrap();
        assert_eq!(ok, Price::new(dec!(21.00)));
    }

    #[test]
    fn test_do_nothing_is_side_specific() {
        let below = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::DoNothing,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(below, SkipReason::BelowMinNoAction);

        let above = clamp(
            Price::new(dec!(35.00)),
            &bounds("20.00", "30.00"),
            PriceRule::JumpToMin,
            PriceRule::DoNothing,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(above, SkipReason::AboveMaxNoAction);
    }

    #[test]
    fn test_default_outside_bounds_is_violation() {
        let err = clamp(
            Price::new(dec!(5.00)),
            &bounds("20.00", "30.00"),
            PriceRule::DefaultPrice,
            PriceRule::JumpToMax,
            Some(Price::new(dec!(35.00))),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SkipReason::BoundsViolation { calculated, .. } if calculated == Price::new(dec!(35.00))
        ));
    }

    #[test]
    fn test_unbounded_listing_keeps_raw() {
        let out = clamp(
            Price::new(dec!(9.95)),
            &Bounds::default(),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(9.95)));
    }

    #[test]
    fn test_negative_result_rejected() {
        let err = clamp(
            Price::new(dec!(-0.50)),
            &Bounds::default(),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SkipReason::BoundsViolation { .. }));
    }

    #[test]
    fn test_zero_is_a_valid_price() {
        // A free listing is unusual but legal; prices are >= 0, not > 0.
        let out = clamp(
            Price::ZERO,
            &Bounds::default(),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::ZERO);
    }

    #[test]
    fn test_result_is_rounded() {
        let out = clamp(
            Price::new(dec!(26.495)),
            &bounds("20.00", "50.00"),
            PriceRule::JumpToMin,
            PriceRule::JumpToMax,
            None,
            None,
        )
        .unwrap();
        assert_eq!(out, Price::new(dec!(26.50)));
    }
}
