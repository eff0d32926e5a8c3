//! Per-adapter circuit breaker
//!
//! # States
//! ```text
//! CLOSED    → OPEN       failure_count >= threshold
//! OPEN      → HALF_OPEN  can_make_request() at or after next_attempt_time
//! HALF_OPEN → CLOSED     any recorded success (failure_count reset)
//! HALF_OPEN → OPEN       any recorded failure (count is still at threshold)
//! ```
//!
//! State is in-process only. Every replica tracks upstream health on its own.

use crate::config::BreakerConfig;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Time source, injectable so tests can step past the reset timeout
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += ChronoDuration::from_std(by).unwrap_or_else(|_| ChronoDuration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<DateTime<Utc>>,
    next_attempt_time: Option<DateTime<Utc>>,
}

/// Read-only view for logs and the status endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub next_attempt_time: Option<DateTime<Utc>>,
}

pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: ChronoDuration,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, config: &BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let reset_timeout = ChronoDuration::from_std(config.reset_timeout())
            .unwrap_or_else(|_| ChronoDuration::days(365));

        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold.max(1),
            reset_timeout,
            clock,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                next_attempt_time: None,
            }),
        }
    }

    // A panic while holding the lock cannot leave the fields half-written,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate a call attempt. Moves OPEN → HALF_OPEN once the cooldown has elapsed.
    pub fn can_make_request(&self) -> bool {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let now = self.clock.now();
                let ready = inner.next_attempt_time.map_or(true, |next| now >= next);

                if ready {
                    inner.state = CircuitState::HalfOpen;
                    info!(
                        breaker = %self.name,
                        failure_count = inner.failure_count,
                        "Circuit half-open, probing upstream"
                    );
                }

                ready
            }
        }
    }

    /// Only meaningful while HALF_OPEN. CLOSED successes leave the counter alone.
    pub fn record_success(&self) {
        let mut inner = self.lock();

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            inner.next_attempt_time = None;
            info!(breaker = %self.name, "Circuit closed, upstream recovered");
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        let now = self.clock.now();

        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure_time = Some(now);

        if inner.failure_count >= self.failure_threshold {
            let reopened = inner.state != CircuitState::Closed;
            inner.state = CircuitState::Open;
            inner.next_attempt_time = Some(now + self.reset_timeout);

            warn!(
                breaker = %self.name,
                failure_count = inner.failure_count,
                threshold = self.failure_threshold,
                reopened,
                next_attempt_time = ?inner.next_attempt_time,
                "Circuit opened"
            );
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();

        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.failure_threshold,
            last_failure_time: inner.last_failure_time,
            next_attempt_time: inner.next_attempt_time,
        }
    }
}
