//! Circuit breaker around the charge call.
//!
//! Closed -> Open -> HalfOpen state transitions. The engine acquires a
//! permit before contacting the provider and records the outcome itself,
//! because outcome classification is domain knowledge: a decline or a
//! terminal domain error means the provider answered and counts as a
//! success here.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: State,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker open
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again
    pub success_threshold: u32,
    /// How long the breaker stays open before probing
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Shared breaker; clones observe the same state
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(BreakerState {
                state: State::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            })),
        }
    }

    /// Ask for permission to contact the provider.
    ///
    /// Returns false while the breaker is open; once the cooldown has
    /// elapsed the breaker half-opens and the call is allowed as a probe.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();

        match state.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                if let Some(last_failure) = state.last_failure_time {
                    if last_failure.elapsed() >= self.config.cooldown {
                        state.state = State::HalfOpen;
                        state.success_count = 0;
                        return true;
                    }
                }
                false
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();

        match state.state {
            State::Closed => {
                state.failure_count = 0;
            }
            State::Open => {}
            State::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    state.state = State::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    tracing::info!("Circuit breaker transitioned to CLOSED");
                }
            }
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();

        match state.state {
            State::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.config.failure_threshold {
                    state.state = State::Open;
                    state.last_failure_time = Some(Instant::now());
                    tracing::warn!("Circuit breaker transitioned to OPEN");
                }
            }
            State::Open => {}
            State::HalfOpen => {
                state.state = State::Open;
                state.last_failure_time = Some(Instant::now());
                tracing::warn!("Circuit breaker transitioned back to OPEN from HalfOpen");
            }
        }
    }

    #[allow(clippy::unwrap_used)] // lock poisoning means a panicked holder; propagating is correct
    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap()
    }
}
