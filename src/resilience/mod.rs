//! # Resilience Module
//!
//! Fault isolation for calls to the remote run source.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
