//! Core domain types for the repricing engine.
//!
//! This crate provides the types shared by every stage of the pipeline:
//! - `Price`: precision-safe monetary amount with 2-decimal rounding
//! - `ProductListing`, `B2bTier`: the seller's catalog entry
//! - `Strategy`: repricing strategy configuration
//! - `OfferChange`, `CompetitorOffer`: the canonical offer-change event
//! - `CalculatedPrice`: the persisted repricing result
//! - `SkipReason`, `RepricingDecision`, `EventOutcome`: pipeline sum types

pub mod calculated;
pub mod error;
pub mod listing;
pub mod offer;
pub mod outcome;
pub mod price;
pub mod strategy;

pub use calculated::{CalculatedPrice, TierPrice};
pub use error::{CoreError, Result};
pub use listing::{B2bTier, FulfillmentChannel, ItemCondition, ListingStatus, ProductListing};
pub use offer::{CompetitorOffer, EventSource, OfferChange};
pub use outcome::{EventOutcome, RepricingDecision, SkipReason};
pub use price::Price;
pub use strategy::{B2bCompeteFor, B2bPriceRule, CompeteWith, PriceRule, Strategy};
