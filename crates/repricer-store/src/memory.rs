//! In-memory store with the same key layout and TTL semantics as the Redis
//! gateway. Backs tests and local development without a Redis instance.

use crate::error::{StoreError, StoreResult};
use crate::gateway::PriceStore;
use crate::keys;
use crate::DEFAULT_TTL_SECS;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use repricer_core::{CalculatedPrice, ProductListing, Strategy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Inner {
    /// key -> field -> raw value, mirroring the Redis hashes.
    hashes: HashMap<String, HashMap<String, String>>,
    /// key -> expiry instant.
    expiries: HashMap<String, Instant>,
}

impl Inner {
    fn hash(&self, key: &str) -> Option<&HashMap<String, String>> {
        if let Some(at) = self.expiries.get(key) {
            if *at <= Instant::now() {
                return None;
            }
        }
        self.hashes.get(key)
    }
}

/// In-memory [`PriceStore`] with simulated per-key TTL and failure
/// injection for retry-path tests.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    ttl: Duration,
    fail: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl MemoryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a transient error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "injected failure",
            ))));
        }
        Ok(())
    }

    /// Seed a listing the way the data populator would.
    pub fn put_listing(&self, asin: &str, seller_id: &str, sku: &str, listing: &ProductListing) {
        let json = serde_json::to_string(listing).expect("listing serializes");
        let mut inner = self.inner.lock();
        let key = keys::listing_key(asin);
        inner
            .hashes
            .entry(key.clone())
            .or_default()
            .insert(keys::listing_field(seller_id, sku), json);
        let at = Instant::now() + self.ttl;
        inner.expiries.insert(key, at);
    }

    /// Seed a strategy from its flat fields.
    pub fn put_strategy_fields(&self, strategy_id: &str, fields: &[(&str, &str)]) {
        let mut inner = self.inner.lock();
        let entry = inner
            .hashes
            .entry(keys::strategy_key(strategy_id))
            .or_default();
        for (k, v) in fields {
            entry.insert(k.to_string(), v.to_string());
        }
    }

    /// Read back a calculated price, as a downstream consumer would.
    pub fn get_calculated_price(&self, seller_id: &str, sku: &str) -> Option<CalculatedPrice> {
        let inner = self.inner.lock();
        let hash = inner.hash(&keys::calculated_key(seller_id))?;
        let json = hash.get(sku)?;
        serde_json::from_str(json).ok()
    }

    /// Remaining TTL on a container key.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let inner = self.inner.lock();
        inner
            .expiries
            .get(key)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn get_listing(
        &self,
        asin: &str,
        seller_id: &str,
        sku: &str,
    ) -> StoreResult<Option<ProductListing>> {
        self.check_fail()?;
        let key = keys::listing_key(asin);
        let field = keys::listing_field(seller_id, sku);
        let inner = self.inner.lock();
        let Some(json) = inner.hash(&key).and_then(|h| h.get(&field)) else {
            return Ok(None);
        };
        let listing: ProductListing =
            serde_json::from_str(json).map_err(|e| StoreError::Decode {
                key: format!("{key}[{field}]"),
                message: e.to_string(),
            })?;
        if listing.is_expired(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(listing))
    }

    async fn get_strategy(&self, strategy_id: &str) -> StoreResult<Option<Strategy>> {
        self.check_fail()?;
        let key = keys::strategy_key(strategy_id);
        let inner = self.inner.lock();
        let Some(fields) = inner.hash(&key) else {
            return Ok(None);
        };
        let strategy = Strategy::from_fields(fields).map_err(|e| StoreError::InvalidRecord {
            key,
            message: e.to_string(),
        })?;
        Ok(Some(strategy))
    }

    async fn put_calculated_price(
        &self,
        seller_id: &str,
        sku: &str,
        record: &CalculatedPrice,
    ) -> StoreResult<()> {
        self.check_fail()?;
        let key = keys::calculated_key(seller_id);
        let json = serde_json::to_string(record).map_err(|e| StoreError::Decode {
            key: key.clone(),
            message: e.to_string(),
        })?;
        let mut inner = self.inner.lock();
        inner
            .hashes
            .entry(key.clone())
            .or_default()
            .insert(sku.to_string(), json);
        let at = Instant::now() + self.ttl;
        inner.expiries.insert(key, at);
        Ok(())
    }

    async fn resolve_owner(
        &self,
        asin: &str,
        candidates: &[String],
    ) -> StoreResult<Option<(String, String)>> {
        self.check_fail()?;
        let key = keys::listing_key(asin);
        let inner = self.inner.lock();
        let Some(hash) = inner.hash(&key) else {
            return Ok(None);
        };
        let mut fields: Vec<&String> = hash.keys().collect();
        fields.sort();

        let mut first: Option<(String, String)> = None;
        for field in fields {
            let Some((seller, sku)) = keys::split_listing_field(field) else {
                continue;
            };
            if candidates.iter().any(|c| c == seller) {
                return Ok(Some((seller.to_string(), sku.to_string())));
            }
            if first.is_none() {
                first = Some((seller.to_string(), sku.to_string()));
            }
        }
        Ok(first)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_fail()?;
        Ok(())
    }
}
