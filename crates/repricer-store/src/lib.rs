//! Store gateway for the repricing pipeline.
//!
//! Owns all access to the key-value store. The key layout is shared with
//! external admin tooling and data populators and must not change:
//!
//! - listing:          hash `ASIN_<asin>`, field `<seller_id>:<sku>`, JSON value
//! - strategy:         hash `strategy.<id>`, flat scalar fields
//! - calculated price: hash `CALCULATED_PRICES:<seller_id>`, field `<sku>`, JSON value
//!
//! Every write refreshes the container key's TTL. Reads of expired data are
//! indistinguishable from "not found".

pub mod breaker;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod memory;

pub use breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use error::{StoreError, StoreResult};
pub use gateway::{PriceStore, RedisStore};
pub use memory::MemoryStore;

/// Default record TTL: two hours.
pub const DEFAULT_TTL_SECS: u64 = 2 * 60 * 60;
