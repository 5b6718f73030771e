// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target circuit breaker protecting upstream probes and actions.
//!
//! Transitions: Closed→Open on the failure threshold, Open→HalfOpen once
//! the timeout elapses (evaluated at the start of the next call), and
//! HalfOpen→Closed after enough consecutive successes — any failure in
//! HalfOpen returns straight to Open.

use crate::metrics::Metrics;
use dix_core::Settings;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("circuit breaker {name} is open")]
pub struct BreakerOpen {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

dix_core::simple_display! {
    BreakerState {
        Closed => "closed",
        Open => "open",
        HalfOpen => "half_open",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub max_failures: u32,
    pub timeout: Duration,
    pub half_open_requests: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            timeout: Duration::from_secs(60),
            half_open_requests: 3,
        }
    }
}

impl BreakerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_failures: settings.breaker_max_failures.max(1),
            timeout: settings.breaker_timeout,
            half_open_requests: settings.breaker_half_open_requests.max(1),
        }
    }
}

struct BreakerInner {
    state: BreakerState,
    failures: u32,
    successes: u64,
    consecutive_success: u32,
    last_failure_at: Option<Instant>,
    last_state_change_at: Instant,
}

/// Read-only view of a breaker's counters for status surfaces and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failures: u32,
    pub successes: u64,
    pub consecutive_success: u32,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    metrics: Arc<Metrics>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        config: BreakerConfig,
        now: Instant,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            metrics,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: 0,
                successes: 0,
                consecutive_success: 0,
                last_failure_at: None,
                last_state_change_at: now,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admission check at the start of a call.
    ///
    /// Open breakers reject without invoking the protected function; the
    /// Open→HalfOpen transition happens here once the timeout has elapsed.
    pub fn try_acquire(&self, now: Instant) -> Result<(), BreakerOpen> {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| now.duration_since(t))
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.timeout {
                    self.transition(&mut inner, BreakerState::HalfOpen, now);
                    inner.consecutive_success = 0;
                    Ok(())
                } else {
                    Err(BreakerOpen {
                        name: self.name.clone(),
                    })
                }
            }
        }
    }

    pub fn record_success(&self, now: Instant) {
        let mut inner = self.inner.lock();
        inner.successes += 1;
        inner.consecutive_success += 1;
        // Failures clear only on the HalfOpen→Closed transition (and on
        // reset); successes in Closed never decay the count.
        if inner.state == BreakerState::HalfOpen
            && inner.consecutive_success >= self.config.half_open_requests
        {
            self.transition(&mut inner, BreakerState::Closed, now);
            inner.failures = 0;
        }
    }

    pub fn record_failure(&self, now: Instant) {
        let mut inner = self.inner.lock();
        inner.consecutive_success = 0;
        inner.last_failure_at = Some(now);
        match inner.state {
            BreakerState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.max_failures {
                    self.transition(&mut inner, BreakerState::Open, now);
                }
            }
            BreakerState::HalfOpen => {
                self.transition(&mut inner, BreakerState::Open, now);
            }
            BreakerState::Open => {}
        }
    }

    /// Force Closed and clear counters.
    pub fn reset(&self, now: Instant) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, BreakerState::Closed, now);
        inner.failures = 0;
        inner.consecutive_success = 0;
        inner.last_failure_at = None;
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            failures: inner.failures,
            successes: inner.successes,
            consecutive_success: inner.consecutive_success,
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: BreakerState, now: Instant) {
        if inner.state == to {
            return;
        }
        info!(breaker = %self.name, from = %inner.state, to = %to, "breaker transition");
        self.metrics.inc_counter(
            "breaker_transitions_total",
            &[&self.name, &to.to_string()],
            1.0,
        );
        inner.state = to;
        inner.last_state_change_at = now;
    }
}

/// Process-wide registry handing out one breaker per target name.
pub struct BreakerManager {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    config: BreakerConfig,
    metrics: Arc<Metrics>,
}

impl BreakerManager {
    pub fn new(config: BreakerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            config,
            metrics,
        }
    }

    /// The breaker for a target, created on first use.
    pub fn get(&self, name: &str, now: Instant) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().get(name) {
            return Arc::clone(breaker);
        }
        let mut write = self.breakers.write();
        // Double-checked: another caller may have created it meanwhile.
        if let Some(breaker) = write.get(name) {
            return Arc::clone(breaker);
        }
        let breaker = Arc::new(CircuitBreaker::new(
            name,
            self.config,
            now,
            Arc::clone(&self.metrics),
        ));
        write.insert(name.to_string(), Arc::clone(&breaker));
        breaker
    }

    pub fn snapshots(&self) -> Vec<(String, BreakerSnapshot)> {
        let mut out: Vec<(String, BreakerSnapshot)> = self
            .breakers
            .read()
            .iter()
            .map(|(name, b)| (name.clone(), b.snapshot()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
