//! Circuit breaker state machine, end to end against the public API.

use dix_engine::{BreakerConfig, BreakerManager, BreakerState, CircuitBreaker, Metrics};
use std::time::{Duration, Instant};

/// max_failures=3, timeout=10s, half_open_requests=2. F F F opens the
/// breaker; a call at t+5s is rejected; a call at t+11s is admitted
/// half-open and succeeds; the second success closes it; failures then
/// accumulate from zero.
#[test]
fn breaker_cycle_matches_specification() {
    let t0 = Instant::now();
    let metrics = Metrics::new("");
    let breaker = CircuitBreaker::new(
        "sidecar:polkadot:assethub",
        BreakerConfig {
            max_failures: 3,
            timeout: Duration::from_secs(10),
            half_open_requests: 2,
        },
        t0,
        metrics.clone(),
    );

    for _ in 0..3 {
        assert!(breaker.try_acquire(t0).is_ok());
        breaker.record_failure(t0);
    }
    assert_eq!(breaker.state(), BreakerState::Open);
    assert_eq!(
        metrics.value("breaker_transitions_total", &["sidecar:polkadot:assethub", "open"]),
        Some(1.0)
    );

    assert!(breaker.try_acquire(t0 + Duration::from_secs(5)).is_err());

    let t11 = t0 + Duration::from_secs(11);
    assert!(breaker.try_acquire(t11).is_ok());
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
    breaker.record_success(t11);
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
    breaker.record_success(t11);
    assert_eq!(breaker.state(), BreakerState::Closed);

    breaker.record_failure(t11);
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, BreakerState::Closed);
    assert_eq!(snapshot.failures, 1);
}

/// max_failures=1: a single failure opens the breaker.
#[test]
fn single_failure_threshold_opens_immediately() {
    let now = Instant::now();
    let breaker = CircuitBreaker::new(
        "probe",
        BreakerConfig {
            max_failures: 1,
            timeout: Duration::from_secs(60),
            half_open_requests: 1,
        },
        now,
        Metrics::new(""),
    );
    breaker.record_failure(now);
    assert_eq!(breaker.state(), BreakerState::Open);
    assert!(breaker.try_acquire(now + Duration::from_secs(1)).is_err());
}

/// Any failure in half-open returns to open within one observed call.
#[test]
fn half_open_failure_reopens() {
    let now = Instant::now();
    let breaker = CircuitBreaker::new(
        "probe",
        BreakerConfig {
            max_failures: 1,
            timeout: Duration::from_secs(10),
            half_open_requests: 3,
        },
        now,
        Metrics::new(""),
    );
    breaker.record_failure(now);
    let later = now + Duration::from_secs(11);
    assert!(breaker.try_acquire(later).is_ok());
    breaker.record_failure(later);
    assert_eq!(breaker.state(), BreakerState::Open);
}

/// The manager hands out one breaker per target name.
#[test]
fn per_target_breakers_are_independent() {
    let now = Instant::now();
    let manager = BreakerManager::new(
        BreakerConfig {
            max_failures: 1,
            timeout: Duration::from_secs(60),
            half_open_requests: 1,
        },
        Metrics::new(""),
    );

    manager.get("sync:wf.node.relay.polkadot", now).record_failure(now);
    assert_eq!(
        manager.get("sync:wf.node.relay.polkadot", now).state(),
        BreakerState::Open
    );
    assert_eq!(
        manager.get("sync:wf.node.relay.kusama", now).state(),
        BreakerState::Closed
    );
}
