//! Per-target circuit breaker.
//!
//! Per §4.4: "starts `closed`; transitions to `open` when failure count >=
//! threshold (default 5) within a window; remains `open` for the recovery
//! timeout (default 60s), then transitions to `half-open` on the next call.
//! A success in `half-open` closes the breaker after `successThreshold`
//! (default 1); a failure reopens and restarts the timer."

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BreakerState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for BreakerState {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub recovery_timeout: chrono::Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            recovery_timeout: chrono::Duration::seconds(60),
        }
    }
}

/// Snapshot of a breaker's state (§3 "Circuit breaker state" entity).
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    pub target: String,
    pub state: &'static str,
    pub failure_count: u32,
    pub success_count: u32,
    pub opened_at: Option<DateTime<Utc>>,
}

/// One target's breaker. `Send + Sync`: shared behind an `Arc` by callers
/// that dispatch to the same downstream across concurrent tasks.
pub struct CircuitBreaker {
    target: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    opened_at: Mutex<Option<DateTime<Utc>>>,
}

impl CircuitBreaker {
    pub fn new(target: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            target: target.into(),
            config,
            state: AtomicU8::new(BreakerState::Closed as u8),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Whether a call may proceed right now. Transitions `open` -> `half-open`
    /// when the recovery timeout has elapsed.
    pub fn allow_request(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed_ok = self
                    .opened_at
                    .lock()
                    .map(|ts| Utc::now() - ts >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if elapsed_ok {
                    self.transition_to(BreakerState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        match self.state() {
            BreakerState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    self.transition_to(BreakerState::Closed);
                }
            }
            BreakerState::Closed => {
                self.failure_count.store(0, Ordering::Release);
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            BreakerState::HalfOpen => {
                self.transition_to(BreakerState::Open);
            }
            BreakerState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to(BreakerState::Open);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn transition_to(&self, next: BreakerState) {
        self.state.store(next as u8, Ordering::Release);
        match next {
            BreakerState::Open => {
                *self.opened_at.lock() = Some(Utc::now());
                tracing::warn!(target = %self.target, "circuit breaker opened");
            }
            BreakerState::HalfOpen => {
                self.success_count.store(0, Ordering::Release);
            }
            BreakerState::Closed => {
                self.failure_count.store(0, Ordering::Release);
                self.success_count.store(0, Ordering::Release);
                *self.opened_at.lock() = None;
                tracing::info!(target = %self.target, "circuit breaker closed");
            }
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state();
        BreakerSnapshot {
            target: self.target.clone(),
            state: match state {
                BreakerState::Closed => "closed",
                BreakerState::Open => "open",
                BreakerState::HalfOpen => "half_open",
            },
            failure_count: self.failure_count.load(Ordering::Acquire),
            success_count: self.success_count.load(Ordering::Acquire),
            opened_at: *self.opened_at.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new("svc", CircuitBreakerConfig { failure_threshold: 3, ..Default::default() });
        for _ in 0..2 {
            breaker.record_failure();
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 2,
            recovery_timeout: chrono::Duration::milliseconds(0),
        };
        let breaker = CircuitBreaker::new("svc", config);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            recovery_timeout: chrono::Duration::milliseconds(0),
        };
        let breaker = CircuitBreaker::new("svc", config);
        breaker.record_failure();
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
