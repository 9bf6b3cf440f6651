//! # Circuit Breaker
//!
//! Fails fast while the remote run source is unreachable instead of paying a
//! full timeout on every polled record. Three states: Closed (normal
//! operation), Open (failing fast), and Half-Open (probing recovery).

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// All calls pass through
    Closed = 0,
    /// All calls are rejected until the open timeout elapses
    Open = 1,
    /// A limited number of trial calls are let through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open,
        }
    }
}

/// Thresholds controlling state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing
    pub open_timeout: Duration,
    /// Successful trial calls required to close the circuit again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// Outcome of a protected call
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

#[derive(Debug, Default)]
struct Counters {
    consecutive_failures: u32,
    half_open_calls: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    config: CircuitBreakerConfig,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        debug!(
            component = %name,
            failure_threshold = config.failure_threshold,
            open_timeout_secs = config.open_timeout.as_secs(),
            "Circuit breaker initialized"
        );
        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Run `operation` unless the circuit is open
    ///
    /// `counts_as_failure` decides which errors trip the breaker; errors it
    /// rejects are passed through without affecting the state. A call whose
    /// future is dropped before it finishes (a caller deadline, Ctrl-C) is
    /// recorded as a failure, so a cancelled half-open trial call reopens the
    /// circuit instead of holding its slot forever.
    pub async fn call<F, Fut, T, E>(
        &self,
        operation: F,
        counts_as_failure: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.should_allow_call() {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let mut pending = PendingCall {
            breaker: self,
            settled: false,
        };
        let result = operation().await;
        pending.settled = true;

        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                if counts_as_failure(&e) {
                    self.record_failure();
                } else {
                    self.record_success();
                }
                Err(CircuitBreakerError::OperationFailed(e))
            }
        }
    }

    fn should_allow_call(&self) -> bool {
        let mut counters = self.counters.lock();
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = counters
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.config.open_timeout);
                if elapsed {
                    self.transition(CircuitState::HalfOpen, &mut counters);
                    counters.half_open_calls = 1;
                }
                elapsed
            }
            CircuitState::HalfOpen => {
                if counters.half_open_calls < self.config.success_threshold.max(1) {
                    counters.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut counters = self.counters.lock();
        match self.state() {
            CircuitState::Closed => counters.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                counters.half_open_successes += 1;
                if counters.half_open_successes >= self.config.success_threshold.max(1) {
                    self.transition(CircuitState::Closed, &mut counters);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut counters = self.counters.lock();
        match self.state() {
            CircuitState::Closed => {
                counters.consecutive_failures += 1;
                if counters.consecutive_failures >= self.config.failure_threshold.max(1) {
                    self.transition(CircuitState::Open, &mut counters);
                }
            }
            // Any failed trial call reopens immediately
            CircuitState::HalfOpen => self.transition(CircuitState::Open, &mut counters),
            CircuitState::Open => {}
        }
    }

    fn transition(&self, to: CircuitState, counters: &mut Counters) {
        self.state.store(to as u8, Ordering::Release);
        counters.half_open_calls = 0;
        counters.half_open_successes = 0;
        match to {
            CircuitState::Closed => {
                counters.consecutive_failures = 0;
                counters.opened_at = None;
                info!(component = %self.name, "Circuit breaker closed (recovered)");
            }
            CircuitState::Open => {
                counters.opened_at = Some(Instant::now());
                warn!(
                    component = %self.name,
                    consecutive_failures = counters.consecutive_failures,
                    open_timeout_secs = self.config.open_timeout.as_secs(),
                    "Circuit breaker opened (failing fast)"
                );
            }
            CircuitState::HalfOpen => {
                info!(component = %self.name, "Circuit breaker half-open (probing recovery)");
            }
        }
    }
}

/// Settles a call that was admitted but never completed
struct PendingCall<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(
                component = %self.breaker.name,
                state = ?self.breaker.state(),
                "Protected call cancelled before completion"
            );
            self.breaker.record_failure();
        }
    }
}
