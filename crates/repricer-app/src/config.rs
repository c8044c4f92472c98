//! Environment-driven configuration.
//!
//! Everything is read from the environment at startup; there is no config
//! file. Unset variables fall back to the documented defaults, malformed
//! values are a startup error rather than a silent default.

use crate::error::{AppError, AppResult};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// SQS-compatible endpoint for the queue client.
    pub sqs_endpoint: String,
    /// Queue URLs to poll; empty disables the queue adapter.
    pub sqs_queue_urls: Vec<String>,
    pub sqs_batch_size: u32,
    pub sqs_wait_time_secs: u32,
    pub sqs_visibility_timeout_secs: u32,
    /// Worker pool bound.
    pub max_in_flight: usize,
    /// Internal event stream bound; the webhook answers 503 beyond it.
    pub event_queue_bound: usize,
    /// Per-event processing deadline.
    pub event_deadline: Duration,
    /// How long shutdown waits for in-flight events.
    pub drain_deadline: Duration,
    /// TTL applied to calculated-price container keys.
    pub calculated_price_ttl: Duration,
    /// HTTP bind address.
    pub http_bind: SocketAddr,
    /// Shared secret for the webhook endpoint; unset disables the check.
    pub webhook_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1/".to_string(),
            sqs_endpoint: "http://localhost:9324".to_string(),
            sqs_queue_urls: Vec::new(),
            sqs_batch_size: 10,
            sqs_wait_time_secs: 20,
            sqs_visibility_timeout_secs: 300,
            max_in_flight: 100,
            event_queue_bound: 1000,
            event_deadline: Duration::from_secs(30),
            drain_deadline: Duration::from_secs(30),
            calculated_price_ttl: Duration::from_secs(repricer_store::DEFAULT_TTL_SECS),
            http_bind: "0.0.0.0:8080".parse().expect("static address"),
            webhook_secret: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a lookup function (tests inject maps).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sqs_queue_urls = match lookup("SQS_QUEUE_URLS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            sqs_endpoint: lookup("SQS_ENDPOINT_URL").unwrap_or(defaults.sqs_endpoint),
            sqs_queue_urls,
            sqs_batch_size: parse(&lookup, "SQS_BATCH_SIZE", defaults.sqs_batch_size)?,
            sqs_wait_time_secs: parse(&lookup, "SQS_WAIT_TIME_SECS", defaults.sqs_wait_time_secs)?,
            sqs_visibility_timeout_secs: parse(
                &lookup,
                "SQS_VISIBILITY_TIMEOUT_SECS",
                defaults.sqs_visibility_timeout_secs,
            )?,
            max_in_flight: parse(&lookup, "MAX_IN_FLIGHT", defaults.max_in_flight)?,
            event_queue_bound: parse(&lookup, "EVENT_QUEUE_BOUND", defaults.event_queue_bound)?,
            event_deadline: Duration::from_secs(parse(
                &lookup,
                "EVENT_DEADLINE_SECS",
                defaults.event_deadline.as_secs(),
            )?),
            drain_deadline: Duration::from_secs(parse(
                &lookup,
                "DRAIN_DEADLINE_SECS",
                defaults.drain_deadline.as_secs(),
            )?),
            calculated_price_ttl: Duration::from_secs(parse(
                &lookup,
                "CALCULATED_PRICE_TTL_SECS",
                defaults.calculated_price_ttl.as_secs(),
            )?),
            http_bind: parse(&lookup, "HTTP_BIND", defaults.http_bind)?,
            webhook_secret: lookup("WEBHOOK_SECRET").filter(|s| !s.is_empty()),
        })
    }

    /// Sanity-check cross-field constraints.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_in_flight == 0 {
            return Err(AppError::Config("MAX_IN_FLIGHT must be positive".into()));
        }
        if self.event_queue_bound == 0 {
            return Err(AppError::Config("EVENT_QUEUE_BOUND must be positive".into()));
        }
        // The visibility timeout must outlive the processing deadline or
        // in-flight queue messages get redelivered mid-flight.
        if u64::from(self.sqs_visibility_timeout_secs) <= self.event_deadline.as_secs() {
            return Err(AppError::Config(format!(
                "SQS_VISIBILITY_TIMEOUT_SECS ({}) must exceed EVENT_DEADLINE_SECS ({})",
                self.sqs_visibility_timeout_secs,
                self.event_deadline.as_secs()
            )));
        }
        Ok(())
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {key}={raw}: {e}"))),
        None => Ok(default),
    }
}
