//! Typed access to listings, strategies, and calculated prices.

use crate::error::{StoreError, StoreResult};
use crate::keys;
use async_trait::async_trait;
use chrono::Utc;
use redis::{aio::ConnectionManager, AsyncCommands};
use repricer_core::{CalculatedPrice, ProductListing, Strategy};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Store operations the pipeline depends on.
///
/// The orchestrator, server, and tests take this as an injected handle;
/// production uses [`RedisStore`], tests use
/// [`MemoryStore`](crate::memory::MemoryStore).
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Fetch one listing. Expired (store TTL or application-level) and
    /// missing records both return `None`.
    async fn get_listing(
        &self,
        asin: &str,
        seller_id: &str,
        sku: &str,
    ) -> StoreResult<Option<ProductListing>>;

    /// Fetch a strategy by id.
    async fn get_strategy(&self, strategy_id: &str) -> StoreResult<Option<Strategy>>;

    /// Overwrite the calculated price for (seller, sku) and refresh the
    /// container key's TTL.
    async fn put_calculated_price(
        &self,
        seller_id: &str,
        sku: &str,
        record: &CalculatedPrice,
    ) -> StoreResult<()>;

    /// Resolve which of our sellers owns `asin`, preferring a seller that
    /// appears among `candidates` (the event's offer sellers). Returns the
    /// (seller_id, sku) pair or `None` when nobody we know lists the ASIN.
    async fn resolve_owner(
        &self,
        asin: &str,
        candidates: &[String],
    ) -> StoreResult<Option<(String, String)>>;

    /// Fetch several listings at once. The default implementation loops;
    /// the Redis gateway overrides it with a pipelined read.
    async fn get_listings_batch(
        &self,
        requests: &[(String, String, String)],
    ) -> StoreResult<Vec<Option<ProductListing>>> {
        let mut out = Vec::with_capacity(requests.len());
        for (asin, seller, sku) in requests {
            out.push(self.get_listing(asin, seller, sku).await?);
        }
        Ok(out)
    }

    /// Liveness probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// Redis-backed store gateway.
///
/// Uses a multiplexed `ConnectionManager`: a single auto-reconnecting
/// connection that pipelines arbitrary concurrent requests, cloned cheaply
/// per call.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str, ttl: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        debug!(url, ttl_secs = ttl.as_secs(), "connected to redis");
        Ok(Self { conn, ttl })
    }

    fn decode_listing(key: &str, field: &str, json: &str) -> StoreResult<ProductListing> {
        let listing: ProductListing =
            serde_json::from_str(json).map_err(|e| StoreError::Decode {
                key: format!("{key}[{field}]"),
                message: e.to_string(),
            })?;
        listing.validate().map_err(|e| StoreError::InvalidRecord {
            key: format!("{key}[{field}]"),
            message: e.to_string(),
        })?;
        Ok(listing)
    }

    fn accept_listing(
        key: &str,
        field: &str,
        json: Option<String>,
    ) -> StoreResult<Option<ProductListing>> {
        let Some(json) = json else {
            return Ok(None);
        };
        let listing = Self::decode_listing(key, field, &json)?;
        if listing.is_expired(Utc::now()) {
            debug!(key, field, "listing past application-level expiry");
            return Ok(None);
        }
        Ok(Some(listing))
    }
}

#[async_trait]
impl PriceStore for RedisStore {
    async fn get_listing(
        &self,
        asin: &str,
        seller_id: &str,
        sku: &str,
    ) -> StoreResult<Option<ProductListing>> {
        let key = keys::listing_key(asin);
        let field = keys::listing_field(seller_id, sku);
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.hget(&key, &field).await?;
        Self::accept_listing(&key, &field, json)
    }

    async fn get_strategy(&self, strategy_id: &str) -> StoreResult<Option<Strategy>> {
        let key = keys::strategy_key(strategy_id);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        let strategy = Strategy::from_fields(&fields).map_err(|e| StoreError::InvalidRecord {
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
        let key = keys::calculated_key(seller_id);
        let json = serde_json::to_string(record).map_err(|e| StoreError::Decode {
            key: key.clone(),
            message: e.to_string(),
        })?;
        let mut conn = self.conn.clone();
        // HSET + EXPIRE in one round trip; TTL is refreshed on every write.
        redis::pipe()
            .hset(&key, sku, json)
            .ignore()
            .expire(&key, self.ttl.as_secs() as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(
            seller_id,
            sku,
            new_price = %record.new_price,
            ttl_secs = self.ttl.as_secs(),
            "calculated price written"
        );
        Ok(())
    }

    async fn resolve_owner(
        &self,
        asin: &str,
        candidates: &[String],
    ) -> StoreResult<Option<(String, String)>> {
        let key = keys::listing_key(asin);
        let mut conn = self.conn.clone();
        let mut fields: Vec<String> = conn.hkeys(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        fields.sort();

        let mut first: Option<(String, String)> = None;
        for field in &fields {
            let Some((seller, sku)) = keys::split_listing_field(field) else {
                warn!(%key, %field, "malformed listing field, skipping");
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

    async fn get_listings_batch(
        &self,
        requests: &[(String, String, String)],
    ) -> StoreResult<Vec<Option<ProductListing>>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        let mut addressed = Vec::with_capacity(requests.len());
        for (asin, seller, sku) in requests {
            let key = keys::listing_key(asin);
            let field = keys::listing_field(seller, sku);
            pipe.hget(&key, &field);
            addressed.push((key, field));
        }
        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        let mut out = Vec::with_capacity(raw.len());
        for (json, (key, field)) in raw.into_iter().zip(addressed) {
            out.push(Self::accept_listing(&key, &field, json)?);
        }
        Ok(out)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
