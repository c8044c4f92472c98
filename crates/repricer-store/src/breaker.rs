//! Circuit breaker around store access.
//!
//! Transient store failures are retried by the source queue, but a down
//! Redis would otherwise have every worker burn its deadline discovering
//! the same outage. The breaker trips open when the rolling window shows a
//! majority of failures, fails fast for a cool-down, then lets one probe
//! through.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Length of the rolling observation window.
    pub window: Duration,
    /// Minimum observations in a window before the failure rate counts.
    pub min_samples: u64,
    /// Failure fraction (0..=1) that trips the breaker.
    pub failure_threshold: f64,
    /// How long the breaker stays open before half-opening.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(30),
            min_samples: 10,
            failure_threshold: 0.5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

struct Inner {
    state: State,
    window_start: Instant,
    successes: u64,
    failures: u64,
}

enum State {
    Closed,
    Open { until: Instant },
    HalfOpen { probe_taken: bool },
}

/// Rolling-window circuit breaker. Thread-safe; one instance guards the
/// shared store handle.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                window_start: Instant::now(),
                successes: 0,
                failures: 0,
            }),
        }
    }

    /// Whether a store call may proceed right now.
    ///
    /// While open this returns `false` until the cool-down elapses; the
    /// first caller afterwards gets the half-open probe slot.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => true,
            State::Open { until } => {
                if Instant::now() >= until {
                    info!("store circuit half-open, allowing probe");
                    inner.state = State::HalfOpen { probe_taken: true };
                    true
                } else {
                    false
                }
            }
            State::HalfOpen { probe_taken } => {
                if probe_taken {
                    false
                } else {
                    inner.state = State::HalfOpen { probe_taken: true };
                    true
                }
            }
        }
    }

    /// Record a successful store call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.state, State::HalfOpen { .. }) {
            info!("store circuit closed after successful probe");
            inner.state = State::Closed;
            inner.window_start = Instant::now();
            inner.successes = 0;
            inner.failures = 0;
            return;
        }
        self.roll_window(&mut inner);
        inner.successes += 1;
    }

    /// Record a transient store failure; may trip the breaker.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.state, State::HalfOpen { .. }) {
            warn!("store circuit probe failed, reopening");
            inner.state = State::Open {
                until: Instant::now() + self.config.cooldown,
            };
            return;
        }
        if matches!(inner.state, State::Open { .. }) {
            return;
        }

        self.roll_window(&mut inner);
        inner.failures += 1;

        let total = inner.successes + inner.failures;
        if total >= self.config.min_samples {
            let rate = inner.failures as f64 / total as f64;
            if rate >= self.config.failure_threshold {
                warn!(
                    failures = inner.failures,
                    total,
                    cooldown_secs = self.config.cooldown.as_secs(),
                    "store circuit tripped open"
                );
                inner.state = State::Open {
                    until: Instant::now() + self.config.cooldown,
                };
            }
        }
    }

    /// Current state, resolving an elapsed cool-down to half-open.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock();
        match inner.state {
            State::Closed => BreakerState::Closed,
            State::Open { until } => {
                if Instant::now() >= until {
                    BreakerState::HalfOpen
                } else {
                    BreakerState::Open
                }
            }
            State::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    fn roll_window(&self, inner: &mut Inner) {
        if inner.window_start.elapsed() >= self.config.window {
            inner.window_start = Instant::now();
            inner.successes = 0;
            inner.failures = 0;
        }
    }
}
