//! Repricing strategy configuration.
//!
//! Strategies are stored as flat scalar hash fields and mutated by external
//! admin tooling; this module decodes them into typed configuration. Every
//! enum parses from the exact wire spelling and rejects anything else, so a
//! typo in the admin UI surfaces as a structural error instead of a silent
//! default.

use crate::error::{CoreError, Result};
use crate::price::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Which competing offer the strategy targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompeteWith {
    LowestPrice,
    LowestFbaPrice,
    MatchBuybox,
}

impl FromStr for CompeteWith {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOWEST_PRICE" => Ok(Self::LowestPrice),
            "LOWEST_FBA_PRICE" => Ok(Self::LowestFbaPrice),
            "MATCH_BUYBOX" => Ok(Self::MatchBuybox),
            other => Err(CoreError::InvalidStrategyField {
                field: "compete_with".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CompeteWith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowestPrice => write!(f, "LOWEST_PRICE"),
            Self::LowestFbaPrice => write!(f, "LOWEST_FBA_PRICE"),
            Self::MatchBuybox => write!(f, "MATCH_BUYBOX"),
        }
    }
}

/// What to do when the raw price falls outside the listing bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceRule {
    JumpToMin,
    JumpToMax,
    JumpToAvg,
    DoNothing,
    DefaultPrice,
    MatchCompetitor,
}

impl FromStr for PriceRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "JUMP_TO_MIN" => Ok(Self::JumpToMin),
            "JUMP_TO_MAX" => Ok(Self::JumpToMax),
            "JUMP_TO_AVG" => Ok(Self::JumpToAvg),
            "DO_NOTHING" => Ok(Self::DoNothing),
            "DEFAULT_PRICE" => Ok(Self::DefaultPrice),
            "MATCH_COMPETITOR" => Ok(Self::MatchCompetitor),
            other => Err(CoreError::InvalidStrategyField {
                field: "price_rule".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Which competitor quantity tier a B2B tier competes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum B2bCompeteFor {
    /// Largest competitor tier at or below ours.
    Low,
    /// Smallest competitor tier at or above ours.
    High,
}

impl FromStr for B2bCompeteFor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOW" => Ok(Self::Low),
            "HIGH" => Ok(Self::High),
            other => Err(CoreError::InvalidStrategyField {
                field: "b2b_compete_for".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// How a B2B tier price is derived from the competitor tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum B2bPriceRule {
    /// Midpoint of our tier's listed price and the competitor tier price.
    Average,
    /// Competitor tier price plus the strategy's beat-by offset.
    BeatBy,
}

impl FromStr for B2bPriceRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AVERAGE" => Ok(Self::Average),
            "BEAT_BY" => Ok(Self::BeatBy),
            other => Err(CoreError::InvalidStrategyField {
                field: "b2b_price_rule".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A repricing strategy as configured by the seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub compete_with: CompeteWith,
    /// Signed offset applied to the competitor price: negative undercuts,
    /// positive overshoots, zero matches.
    pub beat_by: Price,
    pub min_price_rule: PriceRule,
    pub max_price_rule: PriceRule,
    #[serde(default)]
    pub b2b_compete_for: Option<B2bCompeteFor>,
    #[serde(default)]
    pub b2b_price_rule: Option<B2bPriceRule>,
}

impl Strategy {
    /// Decode a strategy from the flat scalar hash fields it is stored as.
    ///
    /// Missing `compete_with` falls back to `MATCH_BUYBOX` and a missing
    /// `beat_by` to zero, matching what the admin tooling writes for new
    /// strategies; the rule fields default to the jump rules.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let compete_with = match fields.get("compete_with") {
            Some(v) => v.parse()?,
            None => CompeteWith::MatchBuybox,
        };
        let beat_by = match fields.get("beat_by") {
            Some(v) => Price::new(Decimal::from_str(v)?),
            None => Price::ZERO,
        };
        let min_price_rule = match fields.get("min_price_rule") {
            Some(v) => v.parse()?,
            None => PriceRule::JumpToMin,
        };
        let max_price_rule = match fields.get("max_price_rule") {
            Some(v) => v.parse()?,
            None => PriceRule::JumpToMax,
        };
        let b2b_compete_for = fields
            .get("b2b_compete_for")
            .filter(|v| !v.is_empty())
            .map(|v| v.parse())
            .transpose()?;
        let b2b_price_rule = fields
            .get("b2b_price_rule")
            .filter(|v| !v.is_empty())
            .map(|v| v.parse())
            .transpose()?;

        Ok(Self {
            compete_with,
            beat_by,
            min_price_rule,
            max_price_rule,
            b2b_compete_for,
            b2b_price_rule,
        })
    }
}
