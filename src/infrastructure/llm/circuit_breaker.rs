//! Circuit breaker guarding the generator
//!
//! Process-local three-state machine. No cross-process coordination: each
//! instance trips on its own view of consecutive failures.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::domain::DomainError;

/// Circuit breaker state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Tripped - requests fail fast until the cooldown elapses
    Open,
    /// Cooldown elapsed - a probe request is admitted
    HalfOpen,
}

/// Configuration for the circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// Three-state guard around the generator call
///
/// Concurrent callers may both observe HALF_OPEN and both probe; the design
/// tolerates that one excess call rather than serializing probes.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Executes `fut` under the breaker.
    ///
    /// Fails fast with [`DomainError::CircuitOpen`] while the circuit is
    /// open and the cooldown has not elapsed.
    pub async fn call<F, T>(&self, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.admit()?;

        match fut.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    fn admit(&self) -> Result<(), DomainError> {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                // An open circuit without a stamp cannot prove its cooldown
                // elapsed; stay open for the full window.
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);

                if elapsed >= self.config.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    info!("Circuit breaker half-open, admitting probe");
                    Ok(())
                } else {
                    let retry_after = (self.config.cooldown - elapsed).as_secs().max(1);
                    Err(DomainError::circuit_open(retry_after))
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == CircuitState::HalfOpen {
            info!("Circuit breaker closed after successful probe");
        }

        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();

        inner.consecutive_failures += 1;
        // Every transition into Open stamps the failure time
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                error!("Circuit breaker re-opened after failed probe");
            }
            CircuitState::Closed
                if inner.consecutive_failures >= self.config.failure_threshold =>
            {
                inner.state = CircuitState::Open;
                error!(
                    failures = inner.consecutive_failures,
                    "Circuit breaker opened"
                );
            }
            _ => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
