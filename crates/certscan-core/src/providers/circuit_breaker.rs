//! C7 — Per-provider circuit breaker.
//!
//! A three-state breaker (closed/open/half-open) with consecutive-failure
//! counting and a cooldown-gated half-open probe, guarding every call out to
//! an external provider (`spec.md` §4.7). The kreuzberg crate has no
//! network-calling analogue of its own; this is adapted from the circuit
//! breaker in `Dicklesworthstone-frankenterm/crates/frankenterm-core/src/circuit_breaker.rs`,
//! trading its `std::sync` + global `BTreeMap` registry for this crate's
//! `parking_lot`/`dashmap` idiom.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_cooldown: Duration,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, success_threshold: u32, open_cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            open_cooldown,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            open_cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CircuitState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerStatus {
    pub state: CircuitStateKind,
    pub consecutive_failures: u32,
}

/// State machine for a single provider's circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: CircuitState,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    pub fn with_name(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: CircuitState::Closed,
            consecutive_failures: 0,
        }
    }

    /// Whether a call is currently allowed to proceed.
    pub fn allow(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.open_cooldown {
                    self.state = CircuitState::HalfOpen { successes: 0 };
                    info!(circuit = %self.name, "circuit transitioned to half-open after cooldown");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen { .. } => true,
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => self.consecutive_failures = 0,
            CircuitState::HalfOpen { successes } => {
                let successes = successes + 1;
                if successes >= self.config.success_threshold {
                    self.consecutive_failures = 0;
                    self.state = CircuitState::Closed;
                    info!(circuit = %self.name, "circuit closed after successful probe");
                } else {
                    self.state = CircuitState::HalfOpen { successes };
                }
            }
            CircuitState::Open { .. } => {}
        }
    }

    pub fn record_failure(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.state = CircuitState::Open { opened_at: Instant::now() };
                    warn!(
                        circuit = %self.name,
                        failures = self.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "circuit opened after consecutive failures"
                    );
                }
            }
            CircuitState::HalfOpen { .. } => {
                self.state = CircuitState::Open { opened_at: Instant::now() };
                warn!(circuit = %self.name, "circuit re-opened after half-open probe failed");
            }
            CircuitState::Open { .. } => {}
        }
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let state = match self.state {
            CircuitState::Closed => CircuitStateKind::Closed,
            CircuitState::Open { .. } => CircuitStateKind::Open,
            CircuitState::HalfOpen { .. } => CircuitStateKind::HalfOpen,
        };
        CircuitBreakerStatus {
            state,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

static CIRCUIT_REGISTRY: Lazy<DashMap<String, Arc<parking_lot::Mutex<CircuitBreaker>>>> =
    Lazy::new(DashMap::new);

/// Get or create the named circuit breaker, shared process-wide so repeated
/// calls for the same provider see the same state.
pub fn get_or_register_circuit(
    name: impl Into<String>,
    config: CircuitBreakerConfig,
) -> Arc<parking_lot::Mutex<CircuitBreaker>> {
    let name = name.into();
    CIRCUIT_REGISTRY
        .entry(name.clone())
        .or_insert_with(|| Arc::new(parking_lot::Mutex::new(CircuitBreaker::with_name(name, config))))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(2, 1, Duration::from_millis(20))
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let mut breaker = CircuitBreaker::with_name("test-opens", config());
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(!breaker.allow());
        assert_eq!(breaker.status().state, CircuitStateKind::Open);
    }

    #[test]
    fn half_opens_after_cooldown_and_closes_on_success() {
        let mut breaker = CircuitBreaker::with_name("test-half-open", config());
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.allow());
        std::thread::sleep(Duration::from_millis(25));
        assert!(breaker.allow());
        assert_eq!(breaker.status().state, CircuitStateKind::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.status().state, CircuitStateKind::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let mut breaker = CircuitBreaker::with_name("test-reopen", config());
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(25));
        assert!(breaker.allow());
        breaker.record_failure();
        assert_eq!(breaker.status().state, CircuitStateKind::Open);
    }

    #[test]
    fn registry_returns_shared_instance_per_name() {
        let a = get_or_register_circuit("shared-provider", config());
        let b = get_or_register_circuit("shared-provider", config());
        a.lock().record_failure();
        assert_eq!(b.lock().status().consecutive_failures, 1);
    }
}
