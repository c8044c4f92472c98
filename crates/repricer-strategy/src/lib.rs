//! Pricing strategies.
//!
//! Three strategies share one shape: pick a competitor, compute a raw
//! price, clamp it to the listing bounds. They are modeled as a closed set
//! of variants with a single dispatch function rather than a trait
//! hierarchy; only selection and the raw computation differ.
//!
//! - `ChaseBuyBox`: competitor price plus the beat-by offset.
//! - `MaximiseProfit`: match a higher competitor price exactly while we hold
//!   the buybox.
//! - `OnlySeller`: default price, else the midpoint of the bounds.
//!
//! B2B listings additionally get per-quantity-tier prices.

pub mod b2b;
pub mod bounds;
pub mod engine;
pub mod select;

pub use bounds::{clamp, Bounds};
pub use engine::apply;
pub use select::{select_competitor, select_strategy, StrategyKind};
