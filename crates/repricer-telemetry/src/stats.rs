//! Pipeline counters served by the stats endpoint.
//!
//! Atomic counters shared between the orchestrator and the HTTP surface.
//! Prometheus carries the same numbers with labels; this snapshot is the
//! cheap JSON view the admin tooling polls.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Shared pipeline counters.
#[derive(Debug)]
pub struct PipelineStats {
    started_at: Instant,
    received: AtomicU64,
    ok: AtomicU64,
    skipped: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    prices_written: AtomicU64,
    deadline_exceeded: AtomicU64,
    total_processing_ms: AtomicU64,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            received: AtomicU64::new(0),
            ok: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            prices_written: AtomicU64::new(0),
            deadline_exceeded: AtomicU64::new(0),
            total_processing_ms: AtomicU64::new(0),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub events_received: u64,
    pub events_ok: u64,
    pub events_skipped: u64,
    pub events_retried: u64,
    pub events_dropped: u64,
    pub prices_written: u64,
    pub deadline_exceeded: u64,
    pub avg_processing_ms: f64,
}

impl PipelineStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ok(&self, price_written: bool, processing_ms: u64) {
        self.ok.fetch_add(1, Ordering::Relaxed);
        if price_written {
            self.prices_written.fetch_add(1, Ordering::Relaxed);
        }
        self.total_processing_ms
            .fetch_add(processing_ms, Ordering::Relaxed);
    }

    pub fn record_skip(&self, processing_ms: u64) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.total_processing_ms
            .fetch_add(processing_ms, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadline_exceeded(&self) {
        self.deadline_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let ok = self.ok.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let completed = ok + skipped;
        let total_ms = self.total_processing_ms.load(Ordering::Relaxed);

        StatsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            events_received: self.received.load(Ordering::Relaxed),
            events_ok: ok,
            events_skipped: skipped,
            events_retried: self.retried.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
            prices_written: self.prices_written.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            avg_processing_ms: if completed > 0 {
                total_ms as f64 / completed as f64
            } else {
                0.0
            },
        }
    }

    /// Zero every counter (uptime is unaffected).
    pub fn reset(&self) {
        self.received.store(0, Ordering::Relaxed);
        self.ok.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.retried.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.prices_written.store(0, Ordering::Relaxed);
        self.deadline_exceeded.store(0, Ordering::Relaxed);
        self.total_processing_ms.store(0, Ordering::Relaxed);
    }
}
